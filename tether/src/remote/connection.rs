/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use super::protocol::{write_frame, Format};
use super::TransportError;

/// The write side of one outbound link.
///
/// Writes are serialized under the mutex, so frames from one sender leave in order.
#[derive(Debug)]
pub(super) struct Connection {
    peer: String,
    id: u64,
    writer: Mutex<OwnedWriteHalf>,
}

impl Connection {
    /// Opens a link to `peer`, returning the connection and its read half.
    pub(super) async fn dial(
        peer: &str,
        id: u64,
        timeout: Duration,
    ) -> Result<(Self, OwnedReadHalf), TransportError> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect(peer)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(TransportError::Dial {
                    address: peer.to_string(),
                    source,
                })
            }
            Err(_) => return Err(TransportError::Timeout(timeout)),
        };
        stream.set_nodelay(true)?;
        debug!("Connection #{} dialed {}", id, peer);

        let (reader, writer) = stream.into_split();
        Ok((
            Self {
                peer: peer.to_string(),
                id,
                writer: Mutex::new(writer),
            },
            reader,
        ))
    }

    pub(super) fn id(&self) -> u64 {
        self.id
    }

    pub(super) fn peer(&self) -> &str {
        &self.peer
    }

    /// Writes one frame, failing with [`TransportError::Timeout`] if it stalls.
    pub(super) async fn write(
        &self,
        frame_type: u8,
        format: Format,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        tokio::time::timeout(timeout, write_frame(&mut *writer, frame_type, format, payload))
            .await
            .map_err(|_| TransportError::Timeout(timeout))?
    }
}
