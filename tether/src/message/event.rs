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

/// Everything an actor can observe, in the order its mailbox yields it.
///
/// `Started` is always first and `Stopped` always last. `PeerLost` is produced by the
/// local transport for actors that asked to watch peers; like the lifecycle variants it
/// never crosses the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<M> {
    /// The actor has been registered and may now send.
    Started,
    /// The actor has been poisoned; no further events follow.
    Stopped,
    /// An outbound connection to `address` failed or was closed by the peer.
    PeerLost {
        /// The peer's listen address, as used in its `Pid`s.
        address: String,
    },
    /// An application payload.
    Message(M),
}
