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

//! # Sine wave pulse
//!
//! Sweeps one channel's duty cycle along a sine wave between two bounds at
//! 3 kHz, sending a request every carrier period until interrupted.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p pulsewire-client --example pwm_pulse -- <pin> <min> <max> <period seconds>
//! ```

use pulsewire_client::{DEFAULT_SOCKET_PATH, PwmClient, PwmRequest, PwmResponse, SineWave};
use std::time::{Duration, Instant};

/// Carrier frequency requested for every step
const PULSE_FREQUENCY: i32 = 3000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 5 {
        eprintln!("Usage: {} <pin> <min> <max> <period seconds>", args[0]);
        std::process::exit(1);
    }
    let pin: i32 = args[1].parse()?;
    let min: i32 = args[2].parse()?;
    let max: i32 = args[3].parse()?;
    let Some(wave) = SineWave::from_secs(min, max, args[4].parse()?) else {
        eprintln!("Invalid period {:?}: expected a non-negative number of seconds", args[4]);
        std::process::exit(1);
    };
    let period = wave.period();
    let step = Duration::from_secs(1) / PULSE_FREQUENCY.unsigned_abs();

    let socket = std::env::var("PULSEWIRE_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string());
    let mut client = PwmClient::connect(socket).await?;
    tracing::info!(pin, min = wave.min(), max = wave.max(), ?period, "Pulsing");

    let start = Instant::now();
    let mut ticker = tokio::time::interval(step);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let request = PwmRequest::new(pin, wave.duty_at(start.elapsed()), PULSE_FREQUENCY);
                match client.send(request).await {
                    Ok(PwmResponse::Success) => {}
                    Ok(PwmResponse::Invalid) => {
                        tracing::error!(%request, "Server rejected request");
                        break;
                    }
                    Err(e) if e.is_connection_error() => {
                        tracing::warn!(error = %e, "Server went away");
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    tracing::info!(elapsed = ?start.elapsed(), "Stopped");
    Ok(())
}
