//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Daemon configuration
//!
//! The daemon takes no command line flags. Everything uses the service
//! defaults except the socket path, which `PULSEWIRE_SOCKET` can override.

use pulsewire_service::{DEFAULT_SOCKET_PATH, ServerConfig};
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the control socket path
pub const SOCKET_ENV: &str = "PULSEWIRE_SOCKET";

/// How long Ctrl-C waits for clients before cutting them off
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the server configuration from the process environment
pub fn from_env() -> ServerConfig {
    build(std::env::var_os(SOCKET_ENV))
}

fn build(socket_override: Option<OsString>) -> ServerConfig {
    let socket_path = socket_override
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH));

    ServerConfig::new(socket_path).with_shutdown_timeout(SHUTDOWN_TIMEOUT)
}
