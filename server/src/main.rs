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

//! Pulsewire PWM command daemon
//!
//! Listens on the control socket and applies PWM requests through the logging
//! sink until interrupted with Ctrl-C or SIGTERM. Logging is controlled with `RUST_LOG`.

mod config;

use pulsewire_service::{LoggingSink, PwmServer};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = config::from_env();
    let server = match PwmServer::bind(config, Arc::new(LoggingSink::new())).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start PWM server");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = server.start().await {
        tracing::error!(error = %e, "Failed to start PWM server");
        return ExitCode::FAILURE;
    }

    if let Err(e) = shutdown_signal().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signals");
    }
    tracing::info!("Interrupted, shutting down");

    if let Err(e) = server.shutdown().await {
        tracing::error!(error = %e, "Shutdown failed");
        return ExitCode::FAILURE;
    }

    let metrics = server.metrics().snapshot();
    tracing::info!(
        sessions = metrics.total_sessions,
        applied = metrics.requests_applied,
        rejected = metrics.requests_rejected,
        errors = metrics.total_errors(),
        requests_per_sec = metrics.requests_per_sec(),
        uptime = ?metrics.uptime,
        "PWM server stopped"
    );
    ExitCode::SUCCESS
}
