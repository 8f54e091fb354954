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

use std::fmt::Debug;

use futures::{Stream, StreamExt};
use tether::prelude::*;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::messages::{ChatMessage, ChatPayload, Connect, Disconnect, Rejected};

/// Input line that ends a session.
pub const QUIT: &str = "quit";

/// The actor name a client with `username` is spawned under.
#[must_use]
pub fn client_name(username: &str) -> String {
    format!("client/{username}")
}

/// What a client shows its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Someone else's line.
    Chat(ChatMessage),
    /// The relay refused our `Connect` or `Disconnect`.
    Rejected(Rejected),
}

/// Where a [`Client`] renders incoming chat.
pub trait ChatSink: Debug + Send + 'static {
    /// Shows one incoming item.
    fn deliver(&self, incoming: Incoming);
}

/// Prints chat as `username: text` on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl ChatSink for StdoutSink {
    fn deliver(&self, incoming: Incoming) {
        match incoming {
            Incoming::Chat(message) => println!("{}: {}", message.username, message.text),
            Incoming::Rejected(rejected) => eprintln!("server rejected request: {}", rejected.reason),
        }
    }
}

impl ChatSink for mpsc::UnboundedSender<Incoming> {
    fn deliver(&self, incoming: Incoming) {
        if self.send(incoming).is_err() {
            warn!("chat sink receiver dropped");
        }
    }
}

/// One chat participant.
///
/// Announces itself with `Connect` as soon as it starts and renders whatever the relay
/// forwards. Outgoing lines are sent on its behalf by [`run_client_session`].
#[tether_actor]
pub struct Client {
    username: String,
    server: Pid,
    sink: Box<dyn ChatSink>,
}

impl Client {
    /// Creates a client that will register as `username` with the relay at `server`.
    pub fn new(username: impl Into<String>, server: Pid, sink: impl ChatSink) -> Self {
        Self {
            username: username.into(),
            server,
            sink: Box::new(sink),
        }
    }
}

#[async_trait]
impl Actor<ChatPayload> for Client {
    async fn receive(&mut self, ctx: &mut Context<ChatPayload>, event: Event<ChatPayload>) {
        match event {
            Event::Started => {
                ctx.watch_peers();
                let connect = Connect {
                    username: self.username.clone(),
                };
                ctx.send(&self.server, connect.into()).await;
            }
            Event::Stopped => info!("client {} stopped", ctx.pid()),
            Event::PeerLost { address } if address == self.server.address() => {
                warn!("lost connection to server {}", address);
            }
            Event::PeerLost { .. } => {}
            Event::Message(ChatPayload::ChatMessage(message)) => {
                self.sink.deliver(Incoming::Chat(message));
            }
            Event::Message(ChatPayload::Rejected(rejected)) => {
                warn!(reason = %rejected.reason, "server rejected request");
                self.sink.deliver(Incoming::Rejected(rejected));
            }
            Event::Message(other) => warn!(?other, "client ignores unexpected payload"),
        }
    }
}

/// Feeds `lines` to the relay as `client`, then disconnects and tears the client down.
///
/// Every line becomes a [`ChatMessage`] from `username`. The line [`QUIT`] or the end of
/// the stream sends [`Disconnect`] and returns once the client has stopped.
pub async fn run_client_session<S>(
    engine: &Engine<ChatPayload>,
    server: &Pid,
    client: &Pid,
    username: &str,
    lines: S,
) where
    S: Stream<Item = String>,
{
    let mut lines = std::pin::pin!(lines);
    while let Some(text) = lines.next().await {
        if text == QUIT {
            break;
        }
        let message = ChatMessage {
            text,
            username: username.to_string(),
        };
        engine.send(server, message.into(), Some(client.clone())).await;
    }

    engine
        .send(server, Disconnect {}.into(), Some(client.clone()))
        .await;
    engine.poison(client).await.wait().await;
    info!("disconnected");
}
