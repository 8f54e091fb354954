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

//! TCP transport between engines.
//!
//! Each engine with a listen address runs one [`listener`] that accepts inbound links
//! and feeds decoded envelopes into the local registry. Outbound links are dialed
//! lazily, one per peer address, and are write-only: the peer never answers on them, so
//! a read returning EOF means the peer went away. A dial that is refused or times out is
//! reported the same way.

pub use error::TransportError;
pub use stats::TransportStats;
pub(crate) use transport::Remote;

mod connection;
mod error;
pub(crate) mod listener;
pub mod protocol;
mod stats;
mod transport;
