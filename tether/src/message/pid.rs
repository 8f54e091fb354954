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
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies an actor anywhere in a tether deployment.
///
/// A `Pid` pairs the network address of the engine hosting the actor with the
/// actor's logical name, which is unique per address. Two `Pid`s are equal exactly
/// when both parts are equal, so a `Pid` can be used as a map key on either side of
/// a connection. The value is immutable once built.
///
/// ```
/// use tether::Pid;
///
/// let pid = Pid::new("127.0.0.1:4000", "server/primary");
/// assert_eq!(pid.to_string(), "127.0.0.1:4000/server/primary");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pid {
    address: String,
    id: String,
}

impl Pid {
    /// Creates a `Pid` from an engine address and an actor name.
    pub fn new(address: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            id: id.into(),
        }
    }

    /// The network address of the engine hosting the actor.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The actor's logical name.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.id)
    }
}

static_assertions::assert_impl_all!(Pid: Send, Sync);
