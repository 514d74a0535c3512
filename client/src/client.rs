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

//! PWM command client

use crate::{ClientConfig, ClientError, Result};
use futures::{SinkExt, StreamExt};
use pulsewire_codec::{PwmRequest, PwmResponse, ResponseCodec};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;
use tracing::{debug, trace};

/// Connection to a PWM command server
///
/// One client holds one session on the server. Requests are answered in
/// order; an invalid request makes the server answer and then hang up.
pub struct PwmClient {
    framed: Framed<UnixStream, ResponseCodec>,
    config: ClientConfig,
}

impl PwmClient {
    /// Connect to the server listening at `socket_path`
    pub async fn connect(socket_path: impl Into<PathBuf>) -> Result<Self> {
        Self::connect_with(ClientConfig::new(socket_path)).await
    }

    /// Connect using an explicit configuration
    pub async fn connect_with(config: ClientConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, UnixStream::connect(&config.socket_path))
            .await
            .map_err(|_| ClientError::ConnectionTimeout)??;

        debug!(socket = %config.socket_path.display(), "Connected to PWM server");

        Ok(Self {
            framed: Framed::new(stream, ResponseCodec::new()),
            config,
        })
    }

    /// Send one request and wait for its response
    ///
    /// Returns [`ClientError::ConnectionClosed`] when the server hangs up
    /// without answering, which is what it does when the sink fails.
    pub async fn send(&mut self, request: PwmRequest) -> Result<PwmResponse> {
        trace!(%request, "Sending request");
        self.framed.send(request).await?;
        self.next_response().await
    }

    /// Write raw bytes to the server without waiting for a response
    ///
    /// Useful for sending a frame in pieces.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Wait for the next response line
    pub async fn next_response(&mut self) -> Result<PwmResponse> {
        match timeout(self.config.response_timeout, self.framed.next()).await {
            Ok(Some(Ok(response))) => Ok(response),
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => Err(ClientError::ConnectionClosed),
            Err(_) => Err(ClientError::ResponseTimeout),
        }
    }

    /// Wait until the server closes the connection
    ///
    /// Fails with [`ClientError::UnexpectedResponse`] if the server sends
    /// anything first. There is no timeout; wrap the call if one is needed.
    pub async fn wait_closed(&mut self) -> Result<()> {
        match self.framed.next().await {
            None => Ok(()),
            Some(Ok(response)) => Err(ClientError::UnexpectedResponse(response)),
            Some(Err(e)) => match ClientError::from(e) {
                ClientError::ConnectionClosed => Ok(()),
                other => Err(other),
            },
        }
    }

    /// Close the write side, telling the server no more requests follow
    pub async fn close(mut self) -> Result<()> {
        self.framed.get_mut().shutdown().await?;
        Ok(())
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for PwmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PwmClient")
            .field("socket_path", &self.config.socket_path)
            .finish()
    }
}
