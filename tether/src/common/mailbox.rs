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

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::message::{Envelope, SystemSignal};

/// Everything that can sit in an actor's mailbox.
#[derive(Debug)]
pub(crate) enum Mail<M> {
    Deliver(Envelope<M>),
    PeerLost(String),
    Signal(SystemSignal),
}

/// Creates a bounded mailbox. A zero capacity is raised to one.
pub(crate) fn mailbox<M>(capacity: usize) -> (Outbox<M>, Mailbox<M>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Outbox { sender }, Mailbox { receiver })
}

/// The sending side of a mailbox, held by the registry.
#[derive(Debug)]
pub(crate) struct Outbox<M> {
    sender: mpsc::Sender<Mail<M>>,
}

impl<M> Clone for Outbox<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M: Send + 'static> Outbox<M> {
    /// Enqueues `mail` without waiting. Hands it back if the mailbox is full or closed.
    pub(crate) fn post(&self, mail: Mail<M>) -> Result<(), TrySendError<Mail<M>>> {
        self.sender.try_send(mail)
    }

    /// Enqueues mail that must not be lost to a full mailbox.
    ///
    /// When the mailbox is full a task parks the mail until room frees up, so the caller
    /// never waits on the receiving actor. Hands the mail back only if the mailbox is closed.
    pub(crate) fn post_control(&self, mail: Mail<M>) -> Result<(), Mail<M>> {
        match self.sender.try_send(mail) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(mail)) => Err(mail),
            Err(TrySendError::Full(mail)) => {
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    // A closed mailbox means the actor is already on its way out.
                    let _ = sender.send(mail).await;
                });
                Ok(())
            }
        }
    }
}

/// The receiving side, owned by the actor's dispatch loop.
#[derive(Debug)]
pub(crate) struct Mailbox<M> {
    receiver: mpsc::Receiver<Mail<M>>,
}

impl<M> Mailbox<M> {
    pub(crate) async fn recv(&mut self) -> Option<Mail<M>> {
        self.receiver.recv().await
    }

    /// Stops accepting new mail. Anything already queued stays readable.
    pub(crate) fn close(&mut self) {
        self.receiver.close();
    }
}
