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

//! Per-connection session
//!
//! A [`Session`] owns one client stream and the slot reserved for it. It runs
//! the request loop:
//!
//! ```text
//! AwaitingMessage -> Validating -> Dispatching -> Responding -> AwaitingMessage
//!        |               |             |              |
//!        +---------------+-------------+--------------+-----> Closed
//! ```
//!
//! Waiting for a request is bounded by the idle timeout and writing a response
//! by the write timeout. Whatever ends the loop, the stream is closed first and
//! the slot is released second, both by drop.

use crate::{
    CloseReason, ConnectionId, HardwareSink, ServerMetrics, SessionConfig, SessionState,
    SlotGuard,
};
use futures::{SinkExt, StreamExt};
use pulsewire_codec::{PwmRequest, PwmResponse, RequestCodec, validate};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// A single client session bound to a pool slot
pub struct Session<S> {
    id: ConnectionId,
    // Declared before `slot`: the stream closes before the slot is released.
    framed: Framed<S, RequestCodec>,
    slot: SlotGuard,
    sink: Arc<dyn HardwareSink>,
    config: SessionConfig,
    metrics: Arc<ServerMetrics>,
    state: Arc<AtomicU8>,
    shutdown: CancellationToken,
    created_at: Instant,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a session for `stream`, holding `slot` until it ends
    pub fn new(
        id: ConnectionId,
        stream: S,
        slot: SlotGuard,
        sink: Arc<dyn HardwareSink>,
        config: SessionConfig,
        metrics: Arc<ServerMetrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            framed: Framed::new(stream, RequestCodec::new()),
            slot,
            sink,
            config,
            metrics,
            state: Arc::new(AtomicU8::new(SessionState::AwaitingMessage.as_u8())),
            shutdown,
            created_at: Instant::now(),
        }
    }

    /// Connection ID of this session
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Shared cell holding the session state, for observers
    pub fn state_handle(&self) -> Arc<AtomicU8> {
        Arc::clone(&self.state)
    }

    /// Get the current state
    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Run the session to completion
    ///
    /// Consumes the session; when this returns the stream is closed and the
    /// slot is back in its pool.
    #[instrument(name = "session", skip(self), fields(connection_id = %self.id, slot = %self.slot.slot()))]
    pub async fn run(mut self) -> CloseReason {
        self.metrics.session_opened();
        debug!("Session started");

        let reason = self.event_loop().await;

        self.set_state(SessionState::Closed);
        let duration = self.created_at.elapsed();
        self.metrics.session_closed(reason, duration);
        if reason.is_error() {
            warn!(%reason, ?duration, "Session closed");
        } else {
            info!(%reason, ?duration, "Session closed");
        }
        reason
    }

    async fn event_loop(&mut self) -> CloseReason {
        loop {
            self.set_state(SessionState::AwaitingMessage);

            let request = select! {
                biased;
                _ = self.shutdown.cancelled() => return CloseReason::Shutdown,
                result = timeout(self.config.idle_timeout, self.framed.next()) => match result {
                    Ok(Some(Ok(request))) => request,
                    Ok(None) => return CloseReason::PeerClosed,
                    Ok(Some(Err(e))) if e.is_truncated() => {
                        warn!(error = %e, "Client closed mid-frame");
                        return CloseReason::PeerClosed;
                    }
                    Ok(Some(Err(e))) => {
                        warn!(error = %e, "Read failed");
                        return CloseReason::ReadError;
                    }
                    Err(_) => {
                        debug!(timeout = ?self.config.idle_timeout, "Idle timeout");
                        return CloseReason::IdleTimeout;
                    }
                },
            };
            self.metrics.request_received();

            if let Some(reason) = self.handle_request(request).await {
                return reason;
            }
        }
    }

    /// Validate, dispatch and answer one request
    ///
    /// Returns the close reason when the session must end.
    async fn handle_request(&mut self, request: PwmRequest) -> Option<CloseReason> {
        self.set_state(SessionState::Validating);
        if let Err(e) = validate(&request) {
            self.metrics.request_rejected();
            info!(%request, error = %e, "Invalid request");
            self.set_state(SessionState::Responding);
            return Some(match self.respond(PwmResponse::Invalid).await {
                Ok(()) => CloseReason::Rejected,
                Err(reason) => reason,
            });
        }

        self.set_state(SessionState::Dispatching);
        if let Err(e) = self.sink.drive(&request) {
            self.metrics.sink_failure();
            error!(%request, error = %e, "Hardware sink failed");
            return Some(CloseReason::SinkFailure);
        }
        self.metrics.request_applied();
        debug!(%request, "Request applied");

        self.set_state(SessionState::Responding);
        self.respond(PwmResponse::Success).await.err()
    }

    async fn respond(&mut self, response: PwmResponse) -> Result<(), CloseReason> {
        match timeout(self.config.write_timeout, self.framed.send(response)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "Write failed");
                Err(CloseReason::WriteError)
            }
            Err(_) => {
                warn!(timeout = ?self.config.write_timeout, "Write timed out");
                Err(CloseReason::WriteError)
            }
        }
    }
}

impl<S> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("slot", &self.slot.slot())
            .field(
                "state",
                &SessionState::from_u8(self.state.load(Ordering::Acquire)),
            )
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RecordingSink, SlotPool};
    use pulsewire_codec::ResponseCodec;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    struct Harness {
        session: Session<DuplexStream>,
        client: DuplexStream,
        pool: SlotPool,
        sink: Arc<RecordingSink>,
        metrics: Arc<ServerMetrics>,
        shutdown: CancellationToken,
    }

    fn harness(sink: RecordingSink, config: SessionConfig) -> Harness {
        let (client, server) = duplex(1024);
        let pool = SlotPool::new(1).unwrap();
        let id = ConnectionId::new(1);
        let slot = pool.try_acquire(id).unwrap();
        let sink = Arc::new(sink);
        let metrics = Arc::new(ServerMetrics::new());
        let shutdown = CancellationToken::new();
        let session = Session::new(
            id,
            server,
            slot,
            sink.clone(),
            config,
            metrics.clone(),
            shutdown.clone(),
        );
        Harness {
            session,
            client,
            pool,
            sink,
            metrics,
            shutdown,
        }
    }

    async fn read_to_end(client: &mut DuplexStream) -> String {
        let mut buf = Vec::new();
        client.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_valid_request_then_peer_close() {
        let h = harness(RecordingSink::new(), SessionConfig::default());
        let task = tokio::spawn(h.session.run());

        let mut client = Framed::new(h.client, ResponseCodec::new());
        client.send(PwmRequest::new(18, 512, 1000)).await.unwrap();
        let response = client.next().await.unwrap().unwrap();
        assert_eq!(response, PwmResponse::Success);

        drop(client);
        assert_eq!(task.await.unwrap(), CloseReason::PeerClosed);
        assert_eq!(h.sink.calls(), vec![PwmRequest::new(18, 512, 1000)]);
        assert_eq!(h.pool.active(), 0);
        assert_eq!(h.metrics.snapshot().requests_applied, 1);
    }

    #[tokio::test]
    async fn test_invalid_request_rejected() {
        let mut h = harness(RecordingSink::new(), SessionConfig::default());
        let task = tokio::spawn(h.session.run());

        h.client
            .write_all(&PwmRequest::new(1, 2000, 100).to_bytes())
            .await
            .unwrap();

        assert_eq!(read_to_end(&mut h.client).await, "Invalid PWM parameters\n");
        assert_eq!(task.await.unwrap(), CloseReason::Rejected);
        assert_eq!(h.sink.call_count(), 0);
        assert_eq!(h.pool.active(), 0);
        assert_eq!(h.metrics.snapshot().requests_rejected, 1);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_rejection_is_logged() {
        let h = harness(RecordingSink::new(), SessionConfig::default());
        let mut client = h.client;
        let client_side = async move {
            client
                .write_all(&PwmRequest::new(-1, 10, 100).to_bytes())
                .await
                .unwrap();
            read_to_end(&mut client).await
        };

        // Run inline so the session span nests under the test span
        let (reason, text) = tokio::join!(h.session.run(), client_side);
        assert_eq!(reason, CloseReason::Rejected);
        assert_eq!(text, "Invalid PWM parameters\n");
        assert!(logs_contain("Invalid request"));
        assert!(logs_contain("reason=rejected"));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_applied_request_logged_at_debug() {
        let h = harness(RecordingSink::new(), SessionConfig::default());
        let client_side = async move {
            let mut client = Framed::new(h.client, ResponseCodec::new());
            client.send(PwmRequest::new(18, 512, 1000)).await.unwrap();
            client.next().await.unwrap().unwrap()
        };

        let (reason, response) = tokio::join!(h.session.run(), client_side);
        assert_eq!(reason, CloseReason::PeerClosed);
        assert_eq!(response, PwmResponse::Success);
        logs_assert(|lines: &[&str]| {
            let applied: Vec<_> = lines.iter().filter(|l| l.contains("Request applied")).collect();
            match applied.as_slice() {
                [line] if line.contains("DEBUG") => Ok(()),
                [line] => Err(format!("applied request not at DEBUG: {line}")),
                other => Err(format!("expected one applied-request line, got {}", other.len())),
            }
        });
    }

    #[tokio::test]
    async fn test_split_frame_reassembled() {
        let mut h = harness(RecordingSink::new(), SessionConfig::default());
        let task = tokio::spawn(h.session.run());

        let frame = PwmRequest::new(2, 100, 440).to_bytes();
        h.client.write_all(&frame[..5]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        h.client.write_all(&frame[5..]).await.unwrap();
        h.client.shutdown().await.unwrap();

        assert_eq!(read_to_end(&mut h.client).await, "PWM set successfully\n");
        assert_eq!(task.await.unwrap(), CloseReason::PeerClosed);
        assert_eq!(h.sink.call_count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_frame_is_peer_close() {
        let mut h = harness(RecordingSink::new(), SessionConfig::default());
        let task = tokio::spawn(h.session.run());

        h.client.write_all(&[1, 0, 0]).await.unwrap();
        h.client.shutdown().await.unwrap();

        assert_eq!(read_to_end(&mut h.client).await, "");
        assert_eq!(task.await.unwrap(), CloseReason::PeerClosed);
        assert_eq!(h.sink.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_timeout_closes_without_payload() {
        let config = SessionConfig {
            idle_timeout: Duration::from_secs(60),
            ..SessionConfig::default()
        };
        let mut h = harness(RecordingSink::new(), config);
        let task = tokio::spawn(h.session.run());

        assert_eq!(read_to_end(&mut h.client).await, "");
        assert_eq!(task.await.unwrap(), CloseReason::IdleTimeout);
        assert_eq!(h.pool.active(), 0);
        assert_eq!(h.metrics.snapshot().idle_timeouts, 1);
    }

    #[tokio::test]
    async fn test_sink_failure_closes_without_payload() {
        let mut h = harness(
            RecordingSink::new().with_failing_channel(4),
            SessionConfig::default(),
        );
        let task = tokio::spawn(h.session.run());

        h.client
            .write_all(&PwmRequest::new(4, 10, 100).to_bytes())
            .await
            .unwrap();

        assert_eq!(read_to_end(&mut h.client).await, "");
        assert_eq!(task.await.unwrap(), CloseReason::SinkFailure);
        assert_eq!(h.metrics.snapshot().sink_failures, 1);
        assert_eq!(h.pool.active(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_waiting_session() {
        let h = harness(RecordingSink::new(), SessionConfig::default());
        let state = h.session.state_handle();
        let task = tokio::spawn(h.session.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        h.shutdown.cancel();

        assert_eq!(task.await.unwrap(), CloseReason::Shutdown);
        assert_eq!(
            SessionState::from_u8(state.load(Ordering::Acquire)),
            SessionState::Closed
        );
        assert_eq!(h.pool.active(), 0);
        drop(h.client);
    }
}
