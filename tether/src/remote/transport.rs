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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use super::connection::Connection;
use super::listener::accept_loop;
use super::protocol::{encode_envelope, FRAME_TYPE_ENVELOPE};
use super::{TransportError, TransportStats};
use crate::common::{Registry, TetherConfig};
use crate::message::Envelope;
use crate::traits::TetherMessage;

/// An engine's network side: the listener plus the outbound link table.
pub(crate) struct Remote<M: TetherMessage> {
    inner: Arc<RemoteInner<M>>,
}

struct RemoteInner<M: TetherMessage> {
    registry: Arc<Registry<M>>,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    settings: TetherConfig,
    stats: Arc<TransportStats>,
    cancellation_token: CancellationToken,
    tracker: TaskTracker,
    next_connection_id: AtomicU64,
}

impl<M: TetherMessage> Clone for Remote<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: TetherMessage> Remote<M> {
    /// Starts accepting on an already bound listener.
    pub(crate) fn start(
        listener: TcpListener,
        registry: Arc<Registry<M>>,
        settings: TetherConfig,
        cancellation_token: CancellationToken,
    ) -> Self {
        let stats = Arc::new(TransportStats::new());
        let tracker = TaskTracker::new();

        tracker.spawn(accept_loop(
            listener,
            Arc::clone(&registry),
            settings.max_frame_size(),
            settings.limits.max_connections,
            cancellation_token.clone(),
            Arc::clone(&stats),
        ));

        Self {
            inner: Arc::new(RemoteInner {
                registry,
                connections: Mutex::new(HashMap::new()),
                settings,
                stats,
                cancellation_token,
                tracker,
                next_connection_id: AtomicU64::new(1),
            }),
        }
    }

    pub(crate) fn stats(&self) -> Arc<TransportStats> {
        Arc::clone(&self.inner.stats)
    }

    /// Writes an envelope to the link for its destination address, dialing if needed.
    ///
    /// On a failed write the link is discarded, so the next send redials.
    pub(crate) async fn send(&self, envelope: Envelope<M>) -> Result<(), TransportError> {
        let address = envelope.destination.address().to_string();
        let format = self.inner.settings.transport.format;
        let stats = &self.inner.stats;

        let payload = encode_envelope(&envelope, format, self.inner.settings.max_frame_size())
            .inspect_err(|_| TransportStats::record(&stats.envelopes_dropped))?;

        let connection = match self.connection_for(&address).await {
            Ok(connection) => connection,
            Err(e) => {
                TransportStats::record(&stats.envelopes_dropped);
                if matches!(e, TransportError::Dial { .. } | TransportError::Timeout(_)) {
                    self.peer_unreachable(&address);
                }
                return Err(e);
            }
        };

        match connection
            .write(
                FRAME_TYPE_ENVELOPE,
                format,
                &payload,
                self.inner.settings.write_timeout(),
            )
            .await
        {
            Ok(()) => {
                TransportStats::record(&stats.envelopes_sent);
                trace!("Sent envelope to {} on connection #{}", envelope.destination, connection.id());
                Ok(())
            }
            Err(e) => {
                TransportStats::record(&stats.envelopes_dropped);
                self.connection_lost(connection.peer(), connection.id()).await;
                Err(e)
            }
        }
    }

    async fn connection_for(&self, address: &str) -> Result<Arc<Connection>, TransportError> {
        if let Some(connection) = self.inner.connections.lock().await.get(address) {
            return Ok(Arc::clone(connection));
        }

        // Dial outside the lock so a slow peer does not stall sends to other peers.
        let id = self.inner.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (connection, reader) =
            Connection::dial(address, id, self.inner.settings.dial_timeout()).await?;

        let mut connections = self.inner.connections.lock().await;
        if let Some(existing) = connections.get(address) {
            debug!("Discarding connection #{}; {} was dialed concurrently", id, address);
            return Ok(Arc::clone(existing));
        }
        let connection = Arc::new(connection);
        connections.insert(address.to_string(), Arc::clone(&connection));
        drop(connections);

        info!("Connected to {}", address);
        self.inner
            .tracker
            .spawn(self.clone().monitor(address.to_string(), id, reader));
        Ok(connection)
    }

    /// Watches the read half of an outbound link. Peers never write on it, so any
    /// completed read other than stray bytes means the link is gone.
    async fn monitor(self, address: String, id: u64, mut reader: OwnedReadHalf) {
        let mut buf = [0u8; 64];
        loop {
            tokio::select! {
                biased;

                () = self.inner.cancellation_token.cancelled() => return,

                read = reader.read(&mut buf) => match read {
                    Ok(0) => {
                        debug!("Connection #{} to {} reached EOF", id, address);
                        break;
                    }
                    Ok(n) => trace!("Ignoring {} unexpected bytes from {}", n, address),
                    Err(e) => {
                        debug!("Connection #{} to {} failed: {}", id, address, e);
                        break;
                    }
                },
            }
        }
        self.connection_lost(&address, id).await;
    }

    /// Drops the link to `address` if it is still connection `id`, then notifies watchers.
    async fn connection_lost(&self, address: &str, id: u64) {
        {
            let mut connections = self.inner.connections.lock().await;
            match connections.get(address) {
                Some(current) if current.id() == id => {
                    connections.remove(address);
                }
                _ => return,
            }
        }

        TransportStats::record(&self.inner.stats.peers_lost);
        warn!("Lost connection to {}", address);
        self.inner.registry.notify_peer_lost(address);
    }

    /// A peer that refuses or ignores a dial is reported to watchers like a dropped link.
    fn peer_unreachable(&self, address: &str) {
        TransportStats::record(&self.inner.stats.peers_lost);
        warn!("Peer {} is unreachable", address);
        self.inner.registry.notify_peer_lost(address);
    }

    /// Stops the listener, closes every link and waits for transport tasks to end.
    pub(crate) async fn shutdown(&self) {
        self.inner.cancellation_token.cancel();
        self.inner.connections.lock().await.clear();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        debug!("Transport stopped");
    }
}
