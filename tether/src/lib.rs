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
#![forbid(missing_docs)]

//! # Tether
//!
//! A small actor substrate built on Tokio. Actors are addressed by a [`Pid`]
//! (network address plus logical name) and the same [`Engine::send`] call reaches an
//! actor in this process or one behind a TCP transport in another process.
//!
//! ## Key Concepts
//!
//! - **Actors ([`Actor`])**: user types that receive one [`Event`] at a time from their
//!   own mailbox, so handlers never need locks.
//! - **Engine ([`Engine`])**: owns the registry of spawned actors, routes envelopes by
//!   address, and tears actors down through [`Engine::poison`].
//! - **Remote transport**: binds a listen address, lazily dials peers, and carries
//!   length-prefixed [`Envelope`] frames. Delivery is best effort with per-link FIFO.
//! - **Payloads ([`TetherMessage`])**: one closed enum per application, dispatched with
//!   an exhaustive `match`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tether::prelude::*;
//!
//! #[tether_message]
//! enum Ping {
//!     Ping,
//! }
//!
//! #[tether_actor]
//! struct Echo;
//!
//! #[async_trait]
//! impl Actor<Ping> for Echo {
//!     async fn receive(&mut self, ctx: &mut Context<Ping>, event: Event<Ping>) {
//!         if let Event::Message(ping) = event {
//!             ctx.reply(ping).await;
//!         }
//!     }
//! }
//! ```

/// Engine, registry, mailboxes, configuration and errors.
pub(crate) mod common;

/// The per-actor dispatch loop.
pub(crate) mod actor;

/// PIDs, envelopes, events and system signals.
pub(crate) mod message;

/// Core traits implemented by user code.
pub(crate) mod traits;

/// TCP transport: wire protocol, listener and outbound connections.
pub mod remote;

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `tether-macro`)
/// *   [`tether_macro::tether_message`]: derives the traits every payload needs.
/// *   [`tether_macro::tether_actor`]: derives `Debug` and checks `Send` for actor types.
/// *   [`tether_macro::tether_main`]: builds the Tokio runtime for `main`.
///
/// ## External Crates
/// *   [`async_trait::async_trait`]: required to implement [`Actor`].
pub mod prelude {
    pub use tether_macro::*;

    pub use async_trait::async_trait;

    pub use crate::common::{
        Context, DeliveryError, Engine, EngineConfig, EngineError, LimitsConfig, PoisonHandle,
        TetherConfig, TimeoutConfig, TransportConfig,
    };
    pub use crate::message::{Envelope, Event, Pid};
    pub use crate::remote::protocol::Format;
    pub use crate::remote::{TransportError, TransportStats};
    pub use crate::traits::{Actor, TetherMessage};
}

pub use prelude::*;

#[doc(hidden)]
pub mod __private {
    pub use tokio;
}
