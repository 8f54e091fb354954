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
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use tether::prelude::*;
use tether_chat::{client_name, ChatPayload, Client, Incoming, Relay, RelayConfig, RosterView, RELAY_NAME};
use tokio::sync::mpsc;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

static INIT: Once = Once::new();

/// Initializes the global tracing subscriber once, writing to `logs/chat_tests.txt`.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "chat_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("debug")
            .add_directive("tether_chat=trace".parse().unwrap())
            .add_directive("tether::remote=debug".parse().unwrap());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

fn settings() -> TetherConfig {
    let mut settings = TetherConfig::default();
    settings.timeouts.dial_timeout_ms = 1_000;
    settings.timeouts.actor_shutdown_timeout_ms = 2_000;
    settings
}

/// Launches an engine on a random loopback port.
pub async fn launch_engine() -> anyhow::Result<Engine<ChatPayload>> {
    Ok(Engine::launch(EngineConfig {
        listen_address: Some("127.0.0.1:0".to_string()),
        settings: settings(),
    })
    .await?)
}

/// A relay running on its own engine.
pub struct ChatServer {
    pub engine: Engine<ChatPayload>,
    pub pid: Pid,
    pub roster: RosterView,
}

impl ChatServer {
    pub async fn start(config: RelayConfig) -> anyhow::Result<Self> {
        let engine = launch_engine().await?;
        let (relay, roster) = Relay::new(config);
        let pid = engine.spawn(move || relay, RELAY_NAME)?;
        Ok(Self { engine, pid, roster })
    }

    /// Waits until the roster satisfies `predicate`, failing after five seconds.
    pub async fn wait_for_roster(&self, predicate: impl FnMut(&tether_chat::Roster) -> bool) {
        let mut roster = self.roster.clone();
        tokio::time::timeout(Duration::from_secs(5), roster.wait_for(predicate))
            .await
            .expect("timed out waiting for the roster")
            .expect("relay dropped");
    }
}

/// A client on its own engine, with its rendered output captured.
pub struct ChatClient {
    pub engine: Engine<ChatPayload>,
    pub pid: Pid,
    pub username: String,
    pub incoming: mpsc::UnboundedReceiver<Incoming>,
}

impl ChatClient {
    /// Starts a client and waits until the relay has registered it.
    pub async fn join(server: &ChatServer, username: &str) -> anyhow::Result<Self> {
        let engine = launch_engine().await?;
        let (sink, incoming) = mpsc::unbounded_channel();
        let relay = server.pid.clone();
        let name = username.to_string();
        let pid = engine.spawn(move || Client::new(name, relay, sink), &client_name(username))?;

        let address = engine.address().to_string();
        server
            .wait_for_roster(|roster| roster.username_of(&address) == Some(username))
            .await;

        Ok(Self {
            engine,
            pid,
            username: username.to_string(),
            incoming,
        })
    }

    /// Sends one line through the relay as this client.
    pub async fn say(&self, server: &ChatServer, text: &str) {
        let message = tether_chat::ChatMessage {
            text: text.to_string(),
            username: self.username.clone(),
        };
        self.engine
            .send(&server.pid, message.into(), Some(self.pid.clone()))
            .await;
    }

    pub fn address(&self) -> &str {
        self.engine.address()
    }

    /// The next rendered item, failing after five seconds.
    pub async fn next(&mut self) -> Incoming {
        tokio::time::timeout(Duration::from_secs(5), self.incoming.recv())
            .await
            .expect("timed out waiting for chat")
            .expect("client stopped")
    }

    /// Asserts nothing is rendered for `millis`.
    pub async fn assert_quiet(&mut self, millis: u64) {
        if let Ok(Some(item)) =
            tokio::time::timeout(Duration::from_millis(millis), self.incoming.recv()).await
        {
            panic!("{} unexpectedly received {item:?}", self.username);
        }
    }
}

pub fn chat(text: &str, username: &str) -> Incoming {
    Incoming::Chat(tether_chat::ChatMessage {
        text: text.to_string(),
        username: username.to_string(),
    })
}
