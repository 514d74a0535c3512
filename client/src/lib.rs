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

//! # Pulsewire Client
//!
//! Async client for the Pulsewire PWM command service.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pulsewire_client::{PwmClient, PwmRequest, PwmResponse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = PwmClient::connect("/tmp/pwm_service.sock").await?;
//!
//!     match client.send(PwmRequest::new(18, 512, 1000)).await? {
//!         PwmResponse::Success => println!("applied"),
//!         PwmResponse::Invalid => println!("rejected"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a Waveform
//!
//! ```no_run
//! use pulsewire_client::{PwmClient, PwmRequest, SineWave};
//! use std::time::{Duration, Instant};
//!
//! # async fn example(client: &mut PwmClient) -> Result<(), pulsewire_client::ClientError> {
//! let wave = SineWave::new(0, 1023, Duration::from_secs(2));
//! let start = Instant::now();
//! loop {
//!     let duty = wave.duty_at(start.elapsed());
//!     client.send(PwmRequest::new(18, duty, 3000)).await?;
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//! }
//! # }
//! ```

mod client;
mod config;
mod error;
mod wave;

pub use client::PwmClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use wave::SineWave;

// Re-export the wire types so users need a single dependency
pub use pulsewire_codec::{DEFAULT_SOCKET_PATH, DUTY_MAX, PwmRequest, PwmResponse};
