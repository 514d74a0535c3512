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

//! # One-shot PWM request
//!
//! Sends a single request to the PWM service and prints the response.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p pulsewire-client --example pwm_send -- <pin> <duty 0..1023> <frequency>
//! ```
//!
//! Set `PULSEWIRE_SOCKET` to talk to a server on a non-default socket.

use pulsewire_client::{DEFAULT_SOCKET_PATH, PwmClient, PwmRequest};

fn parse_arg(args: &[String], index: usize, name: &str) -> Result<i32, String> {
    args.get(index)
        .ok_or_else(|| format!("missing {name}"))?
        .parse()
        .map_err(|e| format!("invalid {name}: {e}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: {} <pin> <duty 0..1023> <frequency>", args[0]);
        std::process::exit(1);
    }
    let request = PwmRequest::new(
        parse_arg(&args, 1, "pin")?,
        parse_arg(&args, 2, "duty")?,
        parse_arg(&args, 3, "frequency")?,
    );

    let socket = std::env::var("PULSEWIRE_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string());
    let mut client = PwmClient::connect(socket).await?;
    let response = client.send(request).await?;
    client.close().await?;
    println!("Server response: {response}");

    Ok(())
}
