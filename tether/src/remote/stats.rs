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

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters kept by an engine's transport.
#[derive(Debug, Default)]
pub struct TransportStats {
    /// Total inbound connections accepted.
    pub connections_accepted: AtomicUsize,
    /// Inbound connections currently being served.
    pub connections_active: AtomicUsize,
    /// Envelopes decoded from inbound links.
    pub envelopes_received: AtomicUsize,
    /// Envelopes written to outbound links.
    pub envelopes_sent: AtomicUsize,
    /// Envelopes dropped on either side.
    pub envelopes_dropped: AtomicUsize,
    /// Outbound links that were lost, or peers that could not be dialed.
    pub peers_lost: AtomicUsize,
}

impl TransportStats {
    /// Create new statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of connections accepted.
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.connections_accepted.load(Ordering::Relaxed)
    }

    /// Get the number of active connections.
    #[must_use]
    pub fn connections_active(&self) -> usize {
        self.connections_active.load(Ordering::Relaxed)
    }

    /// Get the number of envelopes received.
    #[must_use]
    pub fn envelopes_received(&self) -> usize {
        self.envelopes_received.load(Ordering::Relaxed)
    }

    /// Get the number of envelopes sent.
    #[must_use]
    pub fn envelopes_sent(&self) -> usize {
        self.envelopes_sent.load(Ordering::Relaxed)
    }

    /// Get the number of envelopes dropped.
    #[must_use]
    pub fn envelopes_dropped(&self) -> usize {
        self.envelopes_dropped.load(Ordering::Relaxed)
    }

    /// Get the number of lost peers.
    #[must_use]
    pub fn peers_lost(&self) -> usize {
        self.peers_lost.load(Ordering::Relaxed)
    }

    pub(crate) fn record(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        let stats = TransportStats::new();
        assert_eq!(stats.connections_accepted(), 0);
        assert_eq!(stats.connections_active(), 0);
        assert_eq!(stats.envelopes_received(), 0);
        assert_eq!(stats.envelopes_sent(), 0);
        assert_eq!(stats.envelopes_dropped(), 0);
        assert_eq!(stats.peers_lost(), 0);
    }

    #[test]
    fn record_increments() {
        let stats = TransportStats::new();
        TransportStats::record(&stats.envelopes_sent);
        TransportStats::record(&stats.envelopes_sent);
        TransportStats::record(&stats.peers_lost);

        assert_eq!(stats.envelopes_sent(), 2);
        assert_eq!(stats.peers_lost(), 1);
    }
}
