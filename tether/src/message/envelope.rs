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
use serde::{Deserialize, Serialize};

use crate::message::Pid;

/// A payload in transit between two actors.
///
/// The envelope is the unit the engine routes and the remote transport frames. The
/// `sender` is `None` when the message originated outside any actor (for example from
/// a binary's `main`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<M> {
    /// Where the payload is going.
    pub destination: Pid,
    /// The actor that sent it, if any.
    pub sender: Option<Pid>,
    /// The application payload.
    pub payload: M,
}

impl<M> Envelope<M> {
    /// Builds an envelope addressed to `destination`.
    pub fn new(destination: Pid, payload: M, sender: Option<Pid>) -> Self {
        Self {
            destination,
            sender,
            payload,
        }
    }
}
