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
use async_trait::async_trait;

use crate::common::Context;
use crate::message::Event;
use crate::traits::TetherMessage;

/// A unit of state that reacts to events from its own mailbox.
///
/// The engine calls [`receive`](Actor::receive) once per event, strictly one at a time,
/// so implementations mutate `self` freely without locking. The first event is always
/// [`Event::Started`] and the last is [`Event::Stopped`].
///
/// # Example
///
/// ```rust,ignore
/// #[tether_actor]
/// struct Counter {
///     seen: usize,
/// }
///
/// #[async_trait]
/// impl Actor<Tick> for Counter {
///     async fn receive(&mut self, _ctx: &mut Context<Tick>, event: Event<Tick>) {
///         if let Event::Message(_) = event {
///             self.seen += 1;
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Actor<M: TetherMessage>: Send + 'static {
    /// Handles one event. `ctx` carries the sender of the current message.
    async fn receive(&mut self, ctx: &mut Context<M>, event: Event<M>);
}
