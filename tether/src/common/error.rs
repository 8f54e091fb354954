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

use thiserror::Error;

use crate::remote::TransportError;

/// Failures while starting an engine or spawning an actor.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An actor with this name is already registered on the engine.
    #[error("an actor named `{0}` is already registered")]
    DuplicateName(String),
    /// The transport could not be started.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Why a single send did not reach a mailbox or the wire.
///
/// [`Engine::send`](crate::Engine::send) logs these and moves on;
/// [`Engine::try_send`](crate::Engine::try_send) hands them back.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// No local actor has this name.
    #[error("no actor named `{0}` is registered")]
    NoSuchActor(String),
    /// The actor's mailbox is at capacity; the message was dropped.
    #[error("the mailbox of `{0}` is full")]
    MailboxFull(String),
    /// The actor is terminating and no longer accepts mail.
    #[error("the mailbox of `{0}` is closed")]
    MailboxClosed(String),
    /// The destination is remote and the engine has no transport.
    #[error("`{0}` is not local and this engine has no transport")]
    Unroutable(String),
    /// The transport failed to dial or write.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
