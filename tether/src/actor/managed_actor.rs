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

use std::marker::PhantomData;

use tokio_util::sync::CancellationToken;
use tracing::{instrument, trace};

use crate::common::{Context, Engine, Mail, Mailbox};
use crate::message::{Event, Pid, SystemSignal};
use crate::traits::{Actor, TetherMessage};

/// A spawned actor together with everything its task needs.
pub(crate) struct ManagedActor<M: TetherMessage, A: Actor<M>> {
    pid: Pid,
    actor: A,
    mailbox: Mailbox<M>,
    engine: Engine<M>,
    cancellation_token: CancellationToken,
    _payload: PhantomData<fn() -> M>,
}

impl<M: TetherMessage, A: Actor<M>> ManagedActor<M, A> {
    pub(crate) fn new(
        pid: Pid,
        actor: A,
        mailbox: Mailbox<M>,
        engine: Engine<M>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            pid,
            actor,
            mailbox,
            engine,
            cancellation_token,
            _payload: PhantomData,
        }
    }

    /// Runs the actor until it is poisoned or the engine is cancelled.
    ///
    /// `Started` is dispatched first and `Stopped` last. Mail is handled strictly one at
    /// a time in arrival order. The actor leaves the registry only after `Stopped`
    /// returns, so a poison handle never resolves early.
    #[instrument(skip(self), fields(pid = %self.pid))]
    pub(crate) async fn wake(mut self) {
        let mut ctx = Context::new(self.pid.clone(), self.engine.clone());
        self.actor.receive(&mut ctx, Event::Started).await;

        loop {
            tokio::select! {
                biased;

                () = self.cancellation_token.cancelled() => {
                    trace!("Forceful cancellation triggered for actor: {}", self.pid);
                    self.mailbox.close();
                    break;
                }

                mail = self.mailbox.recv() => {
                    let Some(mail) = mail else { break; };
                    match mail {
                        Mail::Deliver(envelope) => {
                            trace!(sender = ?envelope.sender, "dispatching message");
                            ctx.set_sender(envelope.sender);
                            self.actor.receive(&mut ctx, Event::Message(envelope.payload)).await;
                        }
                        Mail::PeerLost(address) => {
                            ctx.set_sender(None);
                            self.actor.receive(&mut ctx, Event::PeerLost { address }).await;
                        }
                        Mail::Signal(SystemSignal::Terminate) => {
                            trace!("Terminate signal received for actor: {}. Closing mailbox.", self.pid);
                            self.mailbox.close();
                            break;
                        }
                    }
                }
            }
        }

        ctx.set_sender(None);
        self.actor.receive(&mut ctx, Event::Stopped).await;
        self.engine.registry().deregister(self.pid.id());
        trace!("Actor {} stopped", self.pid);
    }
}
