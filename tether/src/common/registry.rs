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

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace};

use crate::common::{DeliveryError, EngineError, Mail, Outbox};
use crate::message::{Envelope, SystemSignal};

#[derive(Debug)]
struct ActorEntry<M> {
    outbox: Outbox<M>,
    tracker: TaskTracker,
}

/// Name-keyed table of the actors living on one engine.
///
/// Shared by the engine's local send path and the transport's inbound path. Lookups
/// clone what they need and release the shard lock before touching a mailbox. No
/// operation here waits on the receiving actor.
#[derive(Debug)]
pub(crate) struct Registry<M> {
    address: String,
    actors: DashMap<String, ActorEntry<M>>,
    watchers: DashSet<String>,
}

impl<M: Send + 'static> Registry<M> {
    pub(crate) fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            actors: DashMap::new(),
            watchers: DashSet::new(),
        }
    }

    pub(crate) fn address(&self) -> &str {
        &self.address
    }

    pub(crate) fn register(
        &self,
        id: &str,
        outbox: Outbox<M>,
        tracker: TaskTracker,
    ) -> Result<(), EngineError> {
        match self.actors.entry(id.to_string()) {
            Entry::Occupied(_) => Err(EngineError::DuplicateName(id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(ActorEntry { outbox, tracker });
                trace!(id, "registered actor");
                Ok(())
            }
        }
    }

    pub(crate) fn deregister(&self, id: &str) {
        self.watchers.remove(id);
        if self.actors.remove(id).is_some() {
            trace!(id, "deregistered actor");
        }
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.actors.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.actors.len()
    }

    pub(crate) fn ids(&self) -> Vec<String> {
        self.actors.iter().map(|entry| entry.key().clone()).collect()
    }

    fn outbox(&self, id: &str) -> Option<Outbox<M>> {
        self.actors.get(id).map(|entry| entry.outbox.clone())
    }

    /// Enqueues an envelope for the actor named by its destination id.
    ///
    /// A full mailbox refuses the envelope rather than making the caller wait.
    pub(crate) fn deliver(&self, envelope: Envelope<M>) -> Result<(), DeliveryError> {
        let id = envelope.destination.id().to_string();
        let Some(outbox) = self.outbox(&id) else {
            return Err(DeliveryError::NoSuchActor(id));
        };
        outbox.post(Mail::Deliver(envelope)).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::MailboxFull(id),
            TrySendError::Closed(_) => DeliveryError::MailboxClosed(id),
        })
    }

    /// Enqueues a signal and returns the actor's tracker, or `None` if no such actor.
    ///
    /// The tracker is returned even when the mailbox is already closed, since the actor
    /// is then on its way out and waiting on it is still meaningful.
    pub(crate) fn signal(&self, id: &str, signal: SystemSignal) -> Option<TaskTracker> {
        let (outbox, tracker) = {
            let entry = self.actors.get(id)?;
            (entry.outbox.clone(), entry.tracker.clone())
        };
        if outbox.post_control(Mail::Signal(signal)).is_err() {
            debug!(id, ?signal, "mailbox already closed");
        }
        Some(tracker)
    }

    pub(crate) fn watch(&self, id: &str) {
        if self.actors.contains_key(id) {
            self.watchers.insert(id.to_string());
        }
    }

    #[cfg(test)]
    pub(crate) fn is_watching(&self, id: &str) -> bool {
        self.watchers.contains(id)
    }

    /// Tells every watching actor that the link to `address` is gone.
    pub(crate) fn notify_peer_lost(&self, address: &str) {
        let outboxes: Vec<(String, Outbox<M>)> = self
            .watchers
            .iter()
            .filter_map(|id| self.outbox(id.key()).map(|outbox| (id.key().clone(), outbox)))
            .collect();

        for (id, outbox) in outboxes {
            if outbox
                .post_control(Mail::PeerLost(address.to_string()))
                .is_err()
            {
                trace!(id, address, "watcher is terminating, skipping peer-lost notice");
            }
        }
    }
}
