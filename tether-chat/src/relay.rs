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

use std::collections::{BTreeMap, HashMap};

use tether::prelude::*;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::messages::{ChatMessage, ChatPayload, Connect, Rejected};

/// Name the relay is spawned under; clients address `<server address>/server/primary`.
pub const RELAY_NAME: &str = "server/primary";

/// Relay behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayConfig {
    /// Answer a refused `Connect` or `Disconnect` with [`Rejected`]. Off by default:
    /// refusals are only logged.
    pub nack_rejections: bool,
}

/// A snapshot of who is connected: peer address to username.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    users: BTreeMap<String, String>,
}

impl Roster {
    /// Connected `(address, username)` pairs, ordered by address.
    pub fn connected(&self) -> impl Iterator<Item = (&str, &str)> {
        self.users
            .iter()
            .map(|(address, username)| (address.as_str(), username.as_str()))
    }

    /// The username registered from `address`, if any.
    #[must_use]
    pub fn username_of(&self, address: &str) -> Option<&str> {
        self.users.get(address).map(String::as_str)
    }

    /// Number of connected peers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Read-only, always current view of a relay's registry.
///
/// Obtained from [`Relay::new`]; the relay republishes after every transition.
#[derive(Debug, Clone)]
pub struct RosterView {
    receiver: watch::Receiver<Roster>,
}

impl RosterView {
    /// The current roster.
    #[must_use]
    pub fn snapshot(&self) -> Roster {
        self.receiver.borrow().clone()
    }

    /// Waits until `predicate` holds for the roster, returning that roster.
    ///
    /// Returns `None` if the relay has been dropped first.
    pub async fn wait_for(&mut self, predicate: impl FnMut(&Roster) -> bool) -> Option<Roster> {
        self.receiver
            .wait_for(predicate)
            .await
            .ok()
            .map(|roster| roster.clone())
    }
}

/// The session registry and broadcaster.
///
/// Sessions are keyed by the sender's network address, so one address holds at most
/// one session while two addresses may share a username. `clients` and `users` always
/// hold the same keys.
#[tether_actor]
pub struct Relay {
    clients: HashMap<String, Pid>,
    users: HashMap<String, String>,
    config: RelayConfig,
    roster: watch::Sender<Roster>,
}

impl Relay {
    /// Creates a relay and the view that observes it.
    #[must_use]
    pub fn new(config: RelayConfig) -> (Self, RosterView) {
        let (roster, receiver) = watch::channel(Roster::default());
        (
            Self {
                clients: HashMap::new(),
                users: HashMap::new(),
                config,
                roster,
            },
            RosterView { receiver },
        )
    }

    fn publish(&self) {
        let users = self
            .users
            .iter()
            .map(|(address, username)| (address.clone(), username.clone()))
            .collect();
        self.roster.send_replace(Roster { users });
    }

    async fn reject(&self, ctx: &Context<ChatPayload>, to: &Pid, reason: String) {
        if self.config.nack_rejections {
            ctx.send(to, Rejected { reason }.into()).await;
        }
    }

    async fn connect(&mut self, ctx: &Context<ChatPayload>, sender: Pid, connect: Connect) {
        let address = sender.address().to_string();
        if self.clients.contains_key(&address) || self.users.contains_key(&address) {
            warn!(client = %sender, username = %connect.username, "client already connected");
            self.reject(ctx, &sender, format!("{address} is already connected"))
                .await;
            return;
        }

        info!(client = %sender, username = %connect.username, "new client connected");
        self.clients.insert(address.clone(), sender);
        self.users.insert(address, connect.username);
        self.publish();
    }

    async fn disconnect(&mut self, ctx: &Context<ChatPayload>, sender: Pid) {
        let address = sender.address();
        if !self.clients.contains_key(address) {
            warn!(client = %sender, "disconnect from unknown client");
            self.reject(ctx, &sender, format!("{address} is not connected"))
                .await;
            return;
        }

        self.forget(address, "client disconnected");
    }

    fn forget(&mut self, address: &str, reason: &str) {
        let pid = self.clients.remove(address);
        let username = self.users.remove(address);
        if pid.is_some() || username.is_some() {
            info!(address, username = username.as_deref().unwrap_or_default(), "{}", reason);
            self.publish();
        }
    }

    async fn broadcast(&self, ctx: &Context<ChatPayload>, sender: &Pid, message: ChatMessage) {
        info!(from = %sender, msg = %message.text, "message received");
        for pid in self.clients.values().filter(|pid| *pid != sender) {
            ctx.forward(pid, message.clone().into()).await;
        }
    }
}

#[async_trait]
impl Actor<ChatPayload> for Relay {
    async fn receive(&mut self, ctx: &mut Context<ChatPayload>, event: Event<ChatPayload>) {
        match event {
            Event::Started => {
                ctx.watch_peers();
                info!("relay {} started", ctx.pid());
            }
            Event::Stopped => {
                info!("relay {} stopped with {} clients", ctx.pid(), self.clients.len());
            }
            Event::PeerLost { address } => self.forget(&address, "client lost"),
            Event::Message(payload) => {
                let Some(sender) = ctx.sender().cloned() else {
                    warn!(?payload, "ignoring message without a sender");
                    return;
                };
                match payload {
                    ChatPayload::Connect(connect) => self.connect(ctx, sender, connect).await,
                    ChatPayload::Disconnect(_) => self.disconnect(ctx, sender).await,
                    ChatPayload::ChatMessage(message) => {
                        self.broadcast(ctx, &sender, message).await;
                    }
                    ChatPayload::Rejected(rejected) => {
                        warn!(client = %sender, reason = %rejected.reason, "relay ignores Rejected");
                    }
                }
            }
        }
    }
}
