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

//! Accepts inbound links and injects their envelopes into the local registry.

use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{read_frame, FRAME_TYPE_ENVELOPE, FRAME_TYPE_HEARTBEAT};
use super::{TransportError, TransportStats};
use crate::common::Registry;
use crate::message::Envelope;
use crate::traits::TetherMessage;

/// Binds `address` and returns the listener with its resolved local address.
pub(crate) async fn bind(address: &str) -> Result<(TcpListener, String), TransportError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| TransportError::Bind {
            address: address.to_string(),
            source,
        })?;
    let local = listener.local_addr()?;
    if local.ip().is_unspecified() {
        warn!(
            "Listening on wildcard address {}; peers will see a different address in this engine's pids",
            local
        );
    }
    Ok((listener, local.to_string()))
}

/// Main accept loop for the listener.
pub(super) async fn accept_loop<M: TetherMessage>(
    listener: TcpListener,
    registry: Arc<Registry<M>>,
    max_frame_size: usize,
    max_connections: usize,
    cancel_token: CancellationToken,
    stats: Arc<TransportStats>,
) {
    let connection_semaphore = Arc::new(Semaphore::new(max_connections.max(1)));

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                info!("Listener on {} received shutdown signal", registry.address());
                break;
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer)) => {
                        let Ok(permit) = connection_semaphore.clone().try_acquire_owned() else {
                            warn!("Maximum concurrent connections reached, rejecting {}", peer);
                            continue;
                        };

                        TransportStats::record(&stats.connections_accepted);
                        TransportStats::record(&stats.connections_active);
                        let conn_id = stats.connections_accepted();
                        trace!("Accepted connection #{} from {}", conn_id, peer);

                        let registry = registry.clone();
                        let cancel_token = cancel_token.clone();
                        let stats = stats.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, conn_id, registry, max_frame_size, cancel_token, stats.clone()).await;
                            stats.connections_active.fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
                            drop(permit);
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                    }
                }
            }
        }
    }
}

/// Reads frames from one inbound link until EOF, error or shutdown.
///
/// Inbound links are read-only; nothing is ever written back.
async fn handle_connection<M: TetherMessage>(
    stream: TcpStream,
    conn_id: usize,
    registry: Arc<Registry<M>>,
    max_frame_size: usize,
    cancel_token: CancellationToken,
    stats: Arc<TransportStats>,
) {
    // Held for the life of the link: closing it would read as EOF on the dialing side.
    let (mut reader, _writer) = stream.into_split();
    debug!("Connection #{} handler started", conn_id);

    loop {
        tokio::select! {
            biased;

            () = cancel_token.cancelled() => {
                trace!("Connection #{} received shutdown signal", conn_id);
                break;
            }

            frame_result = read_frame(&mut reader, max_frame_size) => {
                match frame_result {
                    Ok((FRAME_TYPE_HEARTBEAT, _, _)) => {
                        trace!("Connection #{} received heartbeat", conn_id);
                    }
                    Ok((FRAME_TYPE_ENVELOPE, format, payload)) => {
                        let envelope: Envelope<M> = match format.deserialize(&payload) {
                            Ok(envelope) => envelope,
                            Err(e) => {
                                warn!("Connection #{} sent an undecodable envelope: {}", conn_id, e);
                                TransportStats::record(&stats.envelopes_dropped);
                                continue;
                            }
                        };
                        TransportStats::record(&stats.envelopes_received);
                        route(&registry, envelope, &stats);
                    }
                    Ok((frame_type, _, _)) => {
                        warn!("Connection #{} received unexpected frame type: {:#04x}", conn_id, frame_type);
                    }
                    Err(TransportError::ConnectionClosed) => {
                        debug!("Connection #{} closed by peer", conn_id);
                        break;
                    }
                    Err(e) => {
                        error!("Connection #{} error: {}", conn_id, e);
                        break;
                    }
                }
            }
        }
    }

    debug!("Connection #{} handler finished", conn_id);
}

fn route<M: TetherMessage>(
    registry: &Registry<M>,
    envelope: Envelope<M>,
    stats: &TransportStats,
) {
    if envelope.destination.address() != registry.address() {
        debug!(
            "Envelope for {} arrived at {}; delivering by name",
            envelope.destination,
            registry.address()
        );
    }

    let destination = envelope.destination.clone();
    if let Err(e) = registry.deliver(envelope) {
        warn!("Dead letter for {}: {}", destination, e);
        TransportStats::record(&stats.envelopes_dropped);
    }
}
