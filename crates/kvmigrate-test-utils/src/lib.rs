// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! # kvmigrate Test Utilities
//!
//! Shared helpers for kvmigrate integration tests:
//! - [`kvmigrate`] builds a command for the CLI binary
//! - [`TestNode`] holds a temporary node home with a data directory that can
//!   be seeded with real engine stores
//! - [`sample_records`] generates deterministic record sets

pub mod cli;
pub mod node;

pub use cli::kvmigrate;
pub use node::{sample_records, TestNode};
