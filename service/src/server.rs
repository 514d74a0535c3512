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

//! PWM command server
//!
//! [`PwmServer`] owns the control socket, the slot pool and the session
//! registry. The accept loop reserves a slot for every client before spawning
//! its session, so at most `max_sessions` clients are served at once and
//! further clients wait in the accept loop until a slot frees up.

use crate::{
    ConnectionId, HardwareSink, Result, ServerConfig, ServerMetrics, ServerSnapshot,
    ServiceError, Session, SessionInfo, SessionState, SlotId, SlotPool,
};
use dashmap::DashMap;
use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on waiting for cancelled sessions during shutdown
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Registry entry for a running session
#[derive(Debug)]
struct SessionEntry {
    slot: SlotId,
    state: Arc<AtomicU8>,
    created_at: Instant,
}

/// Removes a session from the registry when its task ends
struct Registration {
    sessions: Arc<DashMap<ConnectionId, SessionEntry>>,
    id: ConnectionId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}

/// Unix socket PWM command server
///
/// # Example
///
/// ```no_run
/// use pulsewire_service::{LoggingSink, PwmServer, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     let server = PwmServer::bind(config, Arc::new(LoggingSink::new())).await?;
///     server.start().await?;
///
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct PwmServer {
    /// Server configuration
    config: ServerConfig,
    /// Hardware sink shared by every session
    sink: Arc<dyn HardwareSink>,
    /// Session slots
    pool: SlotPool,
    /// Server metrics
    metrics: Arc<ServerMetrics>,
    /// Running sessions
    sessions: Arc<DashMap<ConnectionId, SessionEntry>>,
    /// Bound listener, moved into the accept loop by `start()`
    listener: tokio::sync::Mutex<Option<UnixListener>>,
    /// Server start time
    started_at: Instant,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Stops the accept loop
    stop_accepting: CancellationToken,
    /// Stops sessions still running after the shutdown timeout
    cancel_sessions: CancellationToken,
    /// Accept loop task handle
    accept_handle: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    /// Next connection ID
    next_id: Arc<AtomicU64>,
    /// Device and inode of the socket file this server created
    socket_id: SocketId,
    /// Cleared once the socket file has been removed
    owns_socket: AtomicBool,
}

impl PwmServer {
    /// Prepare the server: validate the configuration, initialize the sink
    /// and bind the control socket
    ///
    /// A stale socket left at the path by an earlier run is removed. Any other
    /// kind of file there is an error. The server does not accept clients until
    /// [`start`](Self::start) is called.
    pub async fn bind(config: ServerConfig, sink: Arc<dyn HardwareSink>) -> Result<Self> {
        config.validate()?;
        let pool = SlotPool::new(config.max_sessions)?;

        sink.initialize()?;

        let path = config.socket_path.clone();
        remove_stale_socket(&path)?;

        let listener = UnixListener::bind(&path).map_err(|source| ServiceError::Bind {
            path: path.clone(),
            source,
        })?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(config.socket_mode))
            .map_err(|source| ServiceError::Permissions {
                path: path.clone(),
                source,
            })?;
        let socket_id = SocketId::of(&path)?;

        tracing::info!(
            socket = %path.display(),
            mode = %format_args!("{:o}", config.socket_mode),
            max_sessions = config.max_sessions,
            "PWM server bound"
        );

        Ok(Self {
            config,
            sink,
            pool,
            metrics: Arc::new(ServerMetrics::new()),
            sessions: Arc::new(DashMap::new()),
            listener: tokio::sync::Mutex::new(Some(listener)),
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            stop_accepting: CancellationToken::new(),
            cancel_sessions: CancellationToken::new(),
            accept_handle: tokio::sync::Mutex::new(None),
            next_id: Arc::new(AtomicU64::new(1)),
            socket_id,
            owns_socket: AtomicBool::new(true),
        })
    }

    /// Start accepting clients
    ///
    /// Spawns the accept loop and returns immediately. A server can be
    /// started once; after [`shutdown`](Self::shutdown) it cannot be restarted.
    pub async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServiceError::AlreadyRunning);
        }
        let Some(listener) = self.listener.lock().await.take() else {
            self.running.store(false, Ordering::SeqCst);
            return Err(ServiceError::ServerStopped);
        };

        tracing::info!(socket = %self.config.socket_path.display(), "Starting PWM server");

        let handle = self.spawn_accept_loop(listener);
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    fn spawn_accept_loop(&self, listener: UnixListener) -> JoinHandle<()> {
        let pool = self.pool.clone();
        let sink = self.sink.clone();
        let metrics = self.metrics.clone();
        let sessions = self.sessions.clone();
        let next_id = self.next_id.clone();
        let session_config = self.config.session_config();
        let backoff = self.config.accept_backoff;
        let stop = self.stop_accepting.clone();
        let cancel_sessions = self.cancel_sessions.clone();

        tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    biased;
                    _ = stop.cancelled() => break,
                    result = listener.accept() => result,
                };

                let stream = match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                        metrics.accept_error();

                        // Back off on errors to avoid a tight loop
                        tokio::select! {
                            _ = stop.cancelled() => break,
                            _ = tokio::time::sleep(backoff) => continue,
                        }
                    }
                };

                let id = ConnectionId::new(next_id.fetch_add(1, Ordering::Relaxed));
                let peer_uid = stream.peer_cred().ok().map(|cred| cred.uid());

                let slot = match pool.try_acquire(id) {
                    Some(slot) => slot,
                    None => {
                        metrics.pool_saturated();
                        tracing::warn!(
                            connection_id = %id,
                            capacity = pool.capacity(),
                            "All session slots busy, waiting for one to free up"
                        );
                        tokio::select! {
                            biased;
                            _ = stop.cancelled() => break,
                            slot = pool.acquire(id) => slot,
                        }
                    }
                };

                tracing::debug!(connection_id = %id, slot = %slot.slot(), ?peer_uid, "Accepted client");

                let slot_id = slot.slot();
                let session = Session::new(
                    id,
                    stream,
                    slot,
                    sink.clone(),
                    session_config.clone(),
                    metrics.clone(),
                    cancel_sessions.clone(),
                );

                // Registered before the task starts so it can never remove an
                // entry that was not inserted yet.
                sessions.insert(
                    id,
                    SessionEntry {
                        slot: slot_id,
                        state: session.state_handle(),
                        created_at: Instant::now(),
                    },
                );
                let registration = Registration {
                    sessions: sessions.clone(),
                    id,
                };

                tokio::spawn(async move {
                    let _registration = registration;
                    session.run().await;
                });
            }

            tracing::info!("Accept loop terminated");
        })
    }

    /// Shut the server down gracefully
    ///
    /// Stops accepting clients, gives running sessions up to the configured
    /// shutdown timeout to finish, cancels the rest and removes the socket file.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::ServerNotRunning);
        }

        tracing::info!(active_sessions = self.pool.active(), "Shutting down PWM server");

        self.stop_accepting.cancel();
        if let Some(handle) = self.accept_handle.lock().await.take() {
            let _ = tokio::time::timeout(CANCEL_GRACE, handle).await;
        }

        if tokio::time::timeout(self.config.shutdown_timeout, self.pool.wait_idle())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.pool.active(),
                "Shutdown timeout elapsed, cancelling sessions"
            );
            self.cancel_sessions.cancel();
            if tokio::time::timeout(CANCEL_GRACE, self.pool.wait_idle())
                .await
                .is_err()
            {
                tracing::error!(remaining = self.pool.active(), "Sessions did not stop");
            }
        }

        self.release_socket();

        tracing::info!("PWM server shutdown complete");
        Ok(())
    }

    /// Remove the socket file once, and only if it is still the one we bound
    fn release_socket(&self) {
        if !self.owns_socket.swap(false, Ordering::SeqCst) {
            return;
        }
        let path = &self.config.socket_path;
        match SocketId::of(path) {
            Ok(current) if current == self.socket_id => remove_socket_file(path),
            Ok(_) => {
                tracing::debug!(socket = %path.display(), "Socket path now belongs to another server");
            }
            Err(ServiceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(socket = %path.display(), error = %e, "Failed to inspect socket file");
            }
        }
    }

    /// Check if the server is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Path of the control socket
    pub fn socket_path(&self) -> &Path {
        &self.config.socket_path
    }

    /// Number of sessions currently holding a slot
    pub fn session_count(&self) -> usize {
        self.pool.active()
    }

    /// Information about every registered session
    pub fn session_infos(&self) -> Vec<SessionInfo> {
        self.sessions
            .iter()
            .map(|entry| SessionInfo {
                id: *entry.key(),
                slot: entry.slot,
                state: SessionState::from_u8(entry.state.load(Ordering::Acquire)),
                created_at: entry.created_at,
            })
            .collect()
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_sessions: self.pool.active(),
            capacity: self.pool.capacity(),
            total_sessions: self.metrics.total_sessions(),
            socket_path: self.config.socket_path.clone(),
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    /// Get the server metrics
    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    /// Get the slot pool
    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl std::fmt::Debug for PwmServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PwmServer")
            .field("socket_path", &self.config.socket_path)
            .field("running", &self.is_running())
            .field("pool", &self.pool)
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for PwmServer {
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            tracing::warn!("PwmServer dropped while still running");
            self.running.store(false, Ordering::SeqCst);
            self.stop_accepting.cancel();
            self.cancel_sessions.cancel();
        }
        self.release_socket();
    }
}

/// Identity of a socket file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SocketId {
    dev: u64,
    ino: u64,
}

impl SocketId {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(Self {
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }
}

/// Remove a socket left behind at `path` by an earlier run
fn remove_stale_socket(path: &Path) -> Result<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_socket() => {
            tracing::warn!(socket = %path.display(), "Removing stale socket");
            std::fs::remove_file(path)?;
            Ok(())
        }
        Ok(_) => Err(ServiceError::NotASocket(PathBuf::from(path))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn remove_socket_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(socket = %path.display(), "Removed socket file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(socket = %path.display(), error = %e, "Failed to remove socket file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingSink;
    use std::sync::atomic::AtomicUsize;

    fn socket_path() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        std::env::temp_dir().join(format!(
            "pulsewire-server-unit-{}-{}.sock",
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let path = socket_path();
        let server = PwmServer::bind(ServerConfig::new(&path), Arc::new(RecordingSink::new()))
            .await
            .unwrap();
        assert!(!server.is_running());
        assert!(path.exists());

        server.start().await.unwrap();
        assert!(server.is_running());

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = PwmServer::bind(
            ServerConfig::new(socket_path()),
            Arc::new(RecordingSink::new()),
        )
        .await
        .unwrap();
        server.start().await.unwrap();

        assert!(matches!(
            server.start().await,
            Err(ServiceError::AlreadyRunning)
        ));

        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_requires_running() {
        let server = PwmServer::bind(
            ServerConfig::new(socket_path()),
            Arc::new(RecordingSink::new()),
        )
        .await
        .unwrap();
        assert!(matches!(
            server.shutdown().await,
            Err(ServiceError::ServerNotRunning)
        ));

        server.start().await.unwrap();
        server.shutdown().await.unwrap();
        assert!(matches!(
            server.shutdown().await,
            Err(ServiceError::ServerNotRunning)
        ));
        assert!(matches!(
            server.start().await,
            Err(ServiceError::ServerStopped)
        ));
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let path = socket_path();
        let server = PwmServer::bind(
            ServerConfig::new(&path).with_max_sessions(4),
            Arc::new(RecordingSink::new()),
        )
        .await
        .unwrap();
        let snapshot = server.snapshot();

        assert_eq!(snapshot.active_sessions, 0);
        assert_eq!(snapshot.capacity, 4);
        assert_eq!(snapshot.total_sessions, 0);
        assert_eq!(snapshot.socket_path, path);
        assert!(server.session_infos().is_empty());
    }

    #[tokio::test]
    async fn test_sink_initialize_failure_is_fatal() {
        let path = socket_path();
        let result = PwmServer::bind(
            ServerConfig::new(&path),
            Arc::new(RecordingSink::new().with_failing_initialize()),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::Sink(_))));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let result = PwmServer::bind(
            ServerConfig::new(socket_path()).with_max_sessions(0),
            Arc::new(RecordingSink::new()),
        )
        .await;
        assert!(matches!(result, Err(ServiceError::InvalidConfig(_))));
    }
}
