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

use tether::prelude::*;

/// Registers the sender under `username`.
#[tether_message(eq)]
pub struct Connect {
    /// Display name shown next to the client's messages.
    pub username: String,
}

/// Removes the sender from the registry.
#[tether_message(eq)]
pub struct Disconnect {}

/// One line of chat.
#[tether_message(eq)]
pub struct ChatMessage {
    /// The line as typed.
    pub text: String,
    /// Who typed it.
    pub username: String,
}

/// Sent back to a client whose `Connect` or `Disconnect` was refused, when the relay is
/// configured to say so.
#[tether_message(eq)]
pub struct Rejected {
    /// Human readable cause.
    pub reason: String,
}

/// Every payload kind the chat exchanges.
///
/// Serialized adjacently tagged, e.g. `{"kind":"Connect","fields":{"username":"alice"}}`.
#[tether_message(eq)]
#[serde(tag = "kind", content = "fields")]
pub enum ChatPayload {
    /// See [`Connect`].
    Connect(Connect),
    /// See [`Disconnect`].
    Disconnect(Disconnect),
    /// See [`ChatMessage`].
    ChatMessage(ChatMessage),
    /// See [`Rejected`].
    Rejected(Rejected),
}

impl From<Connect> for ChatPayload {
    fn from(value: Connect) -> Self {
        Self::Connect(value)
    }
}

impl From<Disconnect> for ChatPayload {
    fn from(value: Disconnect) -> Self {
        Self::Disconnect(value)
    }
}

impl From<ChatMessage> for ChatPayload {
    fn from(value: ChatMessage) -> Self {
        Self::ChatMessage(value)
    }
}

impl From<Rejected> for ChatPayload {
    fn from(value: Rejected) -> Self {
        Self::Rejected(value)
    }
}
