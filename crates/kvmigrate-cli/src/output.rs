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

//! Output formatting utilities for the kvmigrate CLI
//!
//! Consistent, colored output with emoji indicators. Messages meant for the
//! operator go to stdout; errors and hints go to stderr.

use console::style;

/// Print an error message to stderr with red X emoji.
pub fn error(msg: &str) {
    eprintln!("{} {}", style("❌").red().bold(), msg);
}

/// Print a hint to stderr after an error.
pub fn hint(msg: &str) {
    eprintln!("   {}", style(msg).yellow());
}

/// Print a warning message with yellow warning emoji.
pub fn warning(msg: &str) {
    println!("{} {}", style("⚠️").yellow(), msg);
}

/// Print a detail line with key-value formatting.
///
/// ```text
///   Data directory: /home/node/.cometbft/data
///   Source backend: sled
/// ```
pub fn detail(key: &str, value: &str) {
    println!("  {}: {}", key, style(value).cyan());
}

/// Print a header message.
pub fn header(msg: &str) {
    println!("{} {}", style("🔄").cyan().bold(), msg);
}
