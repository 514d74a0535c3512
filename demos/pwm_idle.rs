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

//! # Idle client
//!
//! Connects to the PWM service and never sends anything, reporting how long
//! the server keeps the connection open before its idle timeout hangs up.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p pulsewire-client --example pwm_idle
//! ```

use pulsewire_client::{DEFAULT_SOCKET_PATH, PwmClient};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let socket = std::env::var("PULSEWIRE_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string());
    let mut client = PwmClient::connect(socket).await?;
    tracing::info!("Connected, waiting for the server to hang up");

    let start = Instant::now();
    client.wait_closed().await?;
    println!("Server closed the connection after {:.1?}", start.elapsed());

    Ok(())
}
