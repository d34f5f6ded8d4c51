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

//! Store error types and utilities

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store handle or its engine
#[derive(Error, Debug)]
pub enum StoreError {
    /// No store exists at the requested location
    #[error("store not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The store is held by another process or handle
    #[error("store is locked: {}", .0.display())]
    Locked(PathBuf),

    /// The backend kind is unknown or cannot serve the request
    #[error("unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reported by the underlying storage engine
    #[error("{engine} engine error: {message}")]
    Engine {
        /// Engine that produced the error
        engine: &'static str,
        /// Engine-provided description
        message: String,
    },

    /// Fault injected by the in-memory test provider
    #[error("injected fault: {0}")]
    Injected(String),
}

impl StoreError {
    /// Wrap an engine error, keeping its display text
    pub fn engine<E: std::fmt::Display>(engine: &'static str, err: E) -> Self {
        StoreError::Engine {
            engine,
            message: err.to_string(),
        }
    }

    /// Create an injected fault with context
    pub fn injected<S: Into<String>>(msg: S) -> Self {
        StoreError::Injected(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::engine("sled", err)
    }
}

impl From<fjall::Error> for StoreError {
    fn from(err: fjall::Error) -> Self {
        StoreError::engine("fjall", err)
    }
}
