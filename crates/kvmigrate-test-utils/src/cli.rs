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

//! CLI command helpers

use assert_cmd::Command;

/// Get a Command for the kvmigrate binary.
///
/// # Example
/// ```ignore
/// use kvmigrate_test_utils::kvmigrate;
///
/// kvmigrate()
///     .args(["--data-dir", "/tmp/node/data", "--yes"])
///     .assert()
///     .success();
/// ```
#[allow(deprecated)] // cargo_bin is deprecated but still works for our use case
pub fn kvmigrate() -> Command {
    let mut cmd = Command::cargo_bin("kvmigrate").expect("kvmigrate binary not found");
    // Keep the tests independent of the developer's environment.
    for var in [
        "KVMIGRATE_CONFIG",
        "KVMIGRATE_DATA_DIR",
        "KVMIGRATE_SOURCE_BACKEND",
        "KVMIGRATE_STAGING_DIR",
        "KVMIGRATE_BATCH_SIZE",
        "KVMIGRATE_PROGRESS_INTERVAL_MS",
        "KVMIGRATE_VERIFY",
        "KVMIGRATE_LOG_LEVEL",
        "KVMIGRATE_LOG_FORMAT",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}
