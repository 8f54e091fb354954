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

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::actor::ManagedActor;
use crate::common::{mailbox, DeliveryError, EngineConfig, EngineError, Registry, TetherConfig};
use crate::message::{Envelope, Pid, SystemSignal};
use crate::remote::{listener, Remote, TransportStats};
use crate::traits::{Actor, TetherMessage};

/// Address used by engines launched without a listen address.
const LOCAL_ADDRESS: &str = "local";

/// The runtime that owns a set of actors and routes their mail.
///
/// `Engine` is a cheap handle; clones share the same registry and transport. Every
/// actor receives a clone through its [`Context`](crate::Context).
///
/// A single [`send`](Engine::send) covers both paths: destinations whose address equals
/// [`address`](Engine::address) go straight to a local mailbox, anything else is handed
/// to the TCP transport.
pub struct Engine<M: TetherMessage> {
    inner: Arc<EngineInner<M>>,
}

struct EngineInner<M: TetherMessage> {
    registry: Arc<Registry<M>>,
    remote: Option<Remote<M>>,
    settings: TetherConfig,
    cancellation_token: CancellationToken,
}

impl<M: TetherMessage> Clone for Engine<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: TetherMessage> fmt::Debug for Engine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("address", &self.address())
            .field("actors", &self.actor_count())
            .field("remote", &self.inner.remote.is_some())
            .finish()
    }
}

/// Resolves once a poisoned actor has received `Stopped` and left the registry.
#[derive(Debug, Clone)]
#[must_use = "a poison handle does nothing unless waited on"]
pub struct PoisonHandle {
    tracker: Option<TaskTracker>,
}

impl PoisonHandle {
    fn resolved() -> Self {
        Self { tracker: None }
    }

    /// Waits for the actor's teardown. Returns immediately for unknown actors.
    pub async fn wait(&self) {
        if let Some(tracker) = &self.tracker {
            tracker.wait().await;
        }
    }

    /// Whether teardown has already completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tracker
            .as_ref()
            .map_or(true, |tracker| tracker.is_closed() && tracker.is_empty())
    }
}

impl<M: TetherMessage> Engine<M> {
    /// Starts an engine.
    ///
    /// With a listen address the transport binds it first and the engine takes the bound
    /// socket address as its own, so `127.0.0.1:0` yields a usable random port. Without
    /// one the engine is local-only.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Transport`] if the listen address cannot be bound.
    #[instrument(skip(config), fields(listen_address = ?config.listen_address))]
    pub async fn launch(config: EngineConfig) -> Result<Self, EngineError> {
        let EngineConfig {
            listen_address,
            settings,
        } = config;
        let cancellation_token = CancellationToken::new();

        let (registry, remote) = match listen_address {
            Some(listen_address) => {
                let (tcp_listener, address) = listener::bind(&listen_address).await?;
                let registry = Arc::new(Registry::new(address.clone()));
                let remote = Remote::start(
                    tcp_listener,
                    Arc::clone(&registry),
                    settings.clone(),
                    cancellation_token.child_token(),
                );
                info!("Engine listening on {}", address);
                (registry, Some(remote))
            }
            None => {
                debug!("Engine running without a transport");
                (Arc::new(Registry::new(LOCAL_ADDRESS)), None)
            }
        };

        Ok(Self {
            inner: Arc::new(EngineInner {
                registry,
                remote,
                settings,
                cancellation_token,
            }),
        })
    }

    /// The address this engine stamps on the `Pid`s it creates.
    #[must_use]
    pub fn address(&self) -> &str {
        self.inner.registry.address()
    }

    /// Whether `pid` lives on this engine.
    #[must_use]
    pub fn is_local(&self, pid: &Pid) -> bool {
        pid.address() == self.address()
    }

    /// Number of registered actors.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Whether `pid` names a live local actor.
    #[must_use]
    pub fn contains(&self, pid: &Pid) -> bool {
        self.is_local(pid) && self.inner.registry.contains(pid.id())
    }

    /// Transport counters, if this engine has a transport.
    #[must_use]
    pub fn transport_stats(&self) -> Option<Arc<TransportStats>> {
        self.inner.remote.as_ref().map(Remote::stats)
    }

    /// The settings this engine was launched with.
    #[must_use]
    pub fn settings(&self) -> &TetherConfig {
        &self.inner.settings
    }

    pub(crate) fn registry(&self) -> &Registry<M> {
        &self.inner.registry
    }

    /// Spawns an actor under `name` and returns its `Pid`.
    ///
    /// The actor runs on its own task and sees [`Event::Started`](crate::Event::Started)
    /// before any mail.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateName`] if `name` is already taken on this engine.
    #[instrument(skip(self, factory), fields(engine = %self.address()))]
    pub fn spawn<A, F>(&self, factory: F, name: &str) -> Result<Pid, EngineError>
    where
        A: Actor<M>,
        F: FnOnce() -> A,
    {
        let actor = factory();
        let pid = Pid::new(self.address(), name);
        let (outbox, mailbox) = mailbox(self.inner.settings.limits.mailbox_capacity);
        let tracker = TaskTracker::new();

        self.inner.registry.register(name, outbox, tracker.clone())?;

        let managed = ManagedActor::new(
            pid.clone(),
            actor,
            mailbox,
            self.clone(),
            self.inner.cancellation_token.child_token(),
        );
        tracker.spawn(managed.wake());
        tracker.close();

        trace!("Spawned actor {}", pid);
        Ok(pid)
    }

    /// Sends `payload` to `destination`, tagged with `sender`.
    ///
    /// Delivery is best effort: failures are logged and the message is dropped. Use
    /// [`try_send`](Engine::try_send) to observe them.
    pub async fn send(&self, destination: &Pid, payload: M, sender: Option<Pid>) {
        match self.try_send(destination, payload, sender).await {
            Ok(()) => {}
            Err(DeliveryError::Transport(e)) => {
                error!("Dropping message for {}: {}", destination, e);
            }
            Err(e) => {
                warn!("Dead letter for {}: {}", destination, e);
            }
        }
    }

    /// Like [`send`](Engine::send), but reports why delivery failed.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] when the local actor is missing or closed, when the
    /// destination is remote and no transport exists, or when the transport fails.
    pub async fn try_send(
        &self,
        destination: &Pid,
        payload: M,
        sender: Option<Pid>,
    ) -> Result<(), DeliveryError> {
        let envelope = Envelope::new(destination.clone(), payload, sender);
        if self.is_local(destination) {
            trace!("Local delivery to {}", destination);
            return self.inner.registry.deliver(envelope);
        }

        match &self.inner.remote {
            Some(remote) => remote.send(envelope).await.map_err(DeliveryError::from),
            None => Err(DeliveryError::Unroutable(destination.to_string())),
        }
    }

    /// Asks the actor to stop after the mail already queued ahead of this request.
    ///
    /// The returned handle resolves once the actor has handled `Stopped` and been
    /// deregistered. Unknown or remote `Pid`s give an already-resolved handle.
    #[instrument(skip(self, pid), fields(pid = %pid))]
    pub async fn poison(&self, pid: &Pid) -> PoisonHandle {
        if !self.is_local(pid) {
            warn!("Cannot poison remote actor {}", pid);
            return PoisonHandle::resolved();
        }

        match self
            .inner
            .registry
            .signal(pid.id(), SystemSignal::Terminate)
        {
            Some(tracker) => PoisonHandle {
                tracker: Some(tracker),
            },
            None => {
                debug!("Poisoned unknown actor {}", pid);
                PoisonHandle::resolved()
            }
        }
    }

    /// Subscribes `pid` to [`Event::PeerLost`](crate::Event::PeerLost) notices.
    pub fn watch_peers(&self, pid: &Pid) {
        if self.is_local(pid) {
            self.inner.registry.watch(pid.id());
        }
    }

    /// Poisons every actor, then stops the transport.
    ///
    /// Each actor gets the configured shutdown timeout to finish its queued mail and
    /// handle `Stopped`; stragglers are cancelled.
    #[instrument(skip(self), fields(engine = %self.address()))]
    pub async fn shutdown(&self) {
        let timeout = self.inner.settings.actor_shutdown_timeout();
        let pending = self.inner.registry.ids().into_iter().map(|id| {
            let pid = Pid::new(self.address(), id);
            async move {
                let stopped = async { self.poison(&pid).await.wait().await };
                if tokio::time::timeout(timeout, stopped).await.is_err() {
                    warn!("Actor {} did not stop within {:?}", pid, timeout);
                }
            }
        });
        join_all(pending).await;

        self.inner.cancellation_token.cancel();
        if let Some(remote) = &self.inner.remote {
            remote.shutdown().await;
        }
        info!("Engine {} shut down", self.address());
    }
}

static_assertions::assert_impl_all!(Engine<u32>: Send, Sync, Clone);
static_assertions::assert_impl_all!(PoisonHandle: Send, Sync);
