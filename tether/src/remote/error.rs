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

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the TCP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The listen address could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The requested listen address.
        address: String,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },

    /// An outbound connection could not be opened.
    #[error("failed to dial {address}: {source}")]
    Dial {
        /// The peer address.
        address: String,
        /// The underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Socket read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed frame: bad version, unknown type or format, or oversized.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The envelope could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The peer closed the connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// A dial or write did not finish in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(feature = "msgpack")]
impl From<rmp_serde::encode::Error> for TransportError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(format!("MessagePack serialization failed: {err}"))
    }
}

#[cfg(feature = "msgpack")]
impl From<rmp_serde::decode::Error> for TransportError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(format!("MessagePack deserialization failed: {err}"))
    }
}
