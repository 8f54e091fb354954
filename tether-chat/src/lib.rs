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
#![forbid(unsafe_code)]

//! Broadcast chat built on tether.
//!
//! One [`Relay`] actor, spawned as [`RELAY_NAME`] by `tether-server`, keeps a session
//! registry keyed by each client's network address and fans every [`ChatMessage`] out
//! to every other registered client. Each `tether-client` process runs one [`Client`]
//! actor and feeds it lines with [`run_client_session`].

pub use client::{client_name, run_client_session, ChatSink, Client, Incoming, StdoutSink, QUIT};
pub use messages::{ChatMessage, ChatPayload, Connect, Disconnect, Rejected};
pub use relay::{Relay, RelayConfig, Roster, RosterView, RELAY_NAME};

mod client;
mod messages;
mod relay;

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Stdout is left to chat output.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
