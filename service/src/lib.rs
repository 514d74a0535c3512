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

//! Pulsewire PWM command service
//!
//! A local command server that drives PWM outputs on behalf of clients
//! connected over a Unix domain socket:
//!
//! - Bounded concurrency through a slot pool; the listener waits for a free
//!   slot instead of rejecting clients
//! - One task per client running a small state machine with an idle timeout
//! - Validation before anything reaches the hardware
//! - Lock-free metrics and monitoring
//!
//! # Architecture
//!
//! ```text
//! PwmServer (accept loop)
//!     ↓ acquire
//! SlotPool ──→ SlotGuard
//!     ↓ spawn
//! Session → RequestCodec → validate → HardwareSink
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pulsewire_service::{HardwareSink, PwmServer, ServerConfig, SinkError};
//! use pulsewire_codec::PwmRequest;
//! use std::sync::Arc;
//!
//! struct Gpio;
//!
//! impl HardwareSink for Gpio {
//!     fn drive(&self, request: &PwmRequest) -> Result<(), SinkError> {
//!         // Program the peripheral here
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = PwmServer::bind(ServerConfig::default(), Arc::new(Gpio)).await?;
//!     server.start().await?;
//!     tokio::signal::ctrl_c().await?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod metrics;
mod pool;
mod server;
mod session;
mod sink;
mod types;

pub use config::{DEFAULT_SOCKET_PATH, ServerConfig, SessionConfig};
pub use error::{Result, ServiceError};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use pool::{PoolSnapshot, SlotGuard, SlotPool};
pub use server::PwmServer;
pub use session::Session;
pub use sink::{
    HardwareSink, LoggingSink, MAX_CLOCK_DIVISOR, MIN_CLOCK_DIVISOR, PWM_BASE_HZ, PWM_RANGE,
    PwmSettings, RecordingSink, SinkError,
};
pub use types::{
    CloseReason, ConnectionId, ServerSnapshot, SessionInfo, SessionState, SlotId,
};
