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
use tokio::sync::mpsc;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests.
///
/// Output goes to `logs/tether_tests.txt` so test runs stay quiet on the console.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "tether_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("tether::actor=trace".parse().unwrap())
            .add_directive("tether::remote=trace".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap());

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

/// Payload used across the integration tests.
#[tether_message(eq)]
#[serde(tag = "kind", content = "fields")]
pub enum Probe {
    /// Recorded as-is.
    Note { n: u32 },
    /// Answered with `Note { n }` to the sender.
    Echo { n: u32 },
}

/// What a [`Collector`] saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seen {
    Started,
    Stopped,
    PeerLost(String),
    Message(Probe, Option<Pid>),
}

/// Reports every event to a channel. Optionally watches peers.
#[tether_actor]
pub struct Collector {
    events: mpsc::UnboundedSender<Seen>,
    watch: bool,
}

impl Collector {
    pub fn new(events: mpsc::UnboundedSender<Seen>) -> Self {
        Self {
            events,
            watch: false,
        }
    }

    pub fn watching(events: mpsc::UnboundedSender<Seen>) -> Self {
        Self {
            events,
            watch: true,
        }
    }
}

#[async_trait]
impl Actor<Probe> for Collector {
    async fn receive(&mut self, ctx: &mut Context<Probe>, event: Event<Probe>) {
        let seen = match event {
            Event::Started => {
                if self.watch {
                    ctx.watch_peers();
                }
                Seen::Started
            }
            Event::Stopped => Seen::Stopped,
            Event::PeerLost { address } => Seen::PeerLost(address),
            Event::Message(probe) => {
                if let Probe::Echo { n } = probe {
                    ctx.reply(Probe::Note { n }).await;
                }
                Seen::Message(probe, ctx.sender().cloned())
            }
        };
        let _ = self.events.send(seen);
    }
}

/// Engine settings with short timeouts for tests.
pub fn test_settings() -> TetherConfig {
    let mut settings = TetherConfig::default();
    settings.timeouts.dial_timeout_ms = 1_000;
    settings.timeouts.write_timeout_ms = 1_000;
    settings.timeouts.actor_shutdown_timeout_ms = 2_000;
    settings
}

pub async fn local_engine() -> anyhow::Result<Engine<Probe>> {
    Ok(Engine::launch(EngineConfig {
        listen_address: None,
        settings: test_settings(),
    })
    .await?)
}

pub async fn networked_engine() -> anyhow::Result<Engine<Probe>> {
    Ok(Engine::launch(EngineConfig {
        listen_address: Some("127.0.0.1:0".to_string()),
        settings: test_settings(),
    })
    .await?)
}

/// Spawns a collector and waits for its `Started`.
pub async fn spawn_collector(
    engine: &Engine<Probe>,
    name: &str,
    watch: bool,
) -> anyhow::Result<(Pid, mpsc::UnboundedReceiver<Seen>)> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pid = engine.spawn(
        move || {
            if watch {
                Collector::watching(tx)
            } else {
                Collector::new(tx)
            }
        },
        name,
    )?;
    assert_eq!(next(&mut rx).await, Seen::Started);
    Ok((pid, rx))
}

/// The next observed event, failing the test after five seconds.
pub async fn next(rx: &mut mpsc::UnboundedReceiver<Seen>) -> Seen {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("collector channel closed")
}

/// Asserts nothing arrives for `millis`.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Seen>, millis: u64) {
    if let Ok(Some(seen)) = tokio::time::timeout(Duration::from_millis(millis), rx.recv()).await {
        panic!("unexpected event: {seen:?}");
    }
}
