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

use tracing::warn;

use crate::common::Engine;
use crate::message::Pid;
use crate::traits::TetherMessage;

/// What an actor can see and do while handling one event.
///
/// The context is owned by the actor's dispatch loop and reused across events; only
/// the [`sender`](Context::sender) changes between them.
#[derive(Debug)]
pub struct Context<M: TetherMessage> {
    pid: Pid,
    engine: Engine<M>,
    sender: Option<Pid>,
}

impl<M: TetherMessage> Context<M> {
    pub(crate) fn new(pid: Pid, engine: Engine<M>) -> Self {
        Self {
            pid,
            engine,
            sender: None,
        }
    }

    pub(crate) fn set_sender(&mut self, sender: Option<Pid>) {
        self.sender = sender;
    }

    /// This actor's own `Pid`.
    #[must_use]
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// The sender of the message being handled, if it had one.
    #[must_use]
    pub fn sender(&self) -> Option<&Pid> {
        self.sender.as_ref()
    }

    /// The engine hosting this actor.
    #[must_use]
    pub fn engine(&self) -> &Engine<M> {
        &self.engine
    }

    /// Sends `payload` to `to` with this actor as the sender.
    pub async fn send(&self, to: &Pid, payload: M) {
        self.engine.send(to, payload, Some(self.pid.clone())).await;
    }

    /// Sends `payload` to `to` keeping the current message's sender.
    pub async fn forward(&self, to: &Pid, payload: M) {
        self.engine.send(to, payload, self.sender.clone()).await;
    }

    /// Sends `payload` back to the current sender.
    pub async fn reply(&self, payload: M) {
        match &self.sender {
            Some(sender) => self.send(sender, payload).await,
            None => warn!("{} has nobody to reply to", self.pid),
        }
    }

    /// Enqueues a terminate signal for this actor without waiting for it.
    ///
    /// The current handler and any mail already queued still run.
    pub fn poison_self(&self) {
        let engine = self.engine.clone();
        let pid = self.pid.clone();
        tokio::spawn(async move {
            // Dropped: waiting here would wait on the task that is asking.
            let _ = engine.poison(&pid).await;
        });
    }

    /// Subscribes this actor to peer-loss notices from the transport.
    pub fn watch_peers(&self) {
        self.engine.watch_peers(&self.pid);
    }
}

static_assertions::assert_impl_all!(Context<u32>: Send);
