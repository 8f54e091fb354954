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

//! Frame codec for links between engines.
//!
//! Every frame is a fixed header followed by a payload whose encoding is named in the
//! header, so one link can mix formats.
//!
//! # Wire Format
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Payload Length (4 bytes, big-endian u32, excludes header)     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Protocol Version (1 byte, currently 0x01)                     │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Frame Type (1 byte)                                           │
//! │   0x01 = Envelope                                             │
//! │   0x02 = Heartbeat                                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Format (1 byte)                                               │
//! │   0x01 = JSON                                                 │
//! │   0x02 = MessagePack (feature `msgpack`)                      │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Payload (remaining bytes)                                     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! An envelope payload is `{destination, sender, payload}` where both PIDs are
//! `{address, id}` objects (`sender` may be null) and the payload is the application's
//! tagged enum.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::TransportError;
use crate::message::Envelope;

/// Protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Frame type: an application envelope.
pub const FRAME_TYPE_ENVELOPE: u8 = 0x01;

/// Frame type: keep-alive with an empty payload.
pub const FRAME_TYPE_HEARTBEAT: u8 = 0x02;

/// Frame header size: 4 bytes length + 1 byte version + 1 byte type + 1 byte format.
pub const HEADER_SIZE: usize = 7;

/// Maximum frame size (16 MiB hard limit).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Serialization format for frame payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON format (UTF-8 encoded, human-readable).
    #[default]
    Json,
    /// `MessagePack` format (binary, compact).
    #[cfg(feature = "msgpack")]
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl Format {
    /// Format byte for JSON.
    pub const JSON_BYTE: u8 = 0x01;
    /// Format byte for `MessagePack`.
    pub const MESSAGEPACK_BYTE: u8 = 0x02;

    /// Convert format to wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Json => Self::JSON_BYTE,
            #[cfg(feature = "msgpack")]
            Self::MessagePack => Self::MESSAGEPACK_BYTE,
        }
    }

    /// Parse format from wire byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::JSON_BYTE => Some(Self::Json),
            #[cfg(feature = "msgpack")]
            Self::MESSAGEPACK_BYTE => Some(Self::MessagePack),
            _ => None,
        }
    }

    /// Serialize a value using this format.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if the value cannot be encoded.
    pub fn serialize<T: Serialize>(self, value: &T) -> Result<Vec<u8>, TransportError> {
        match self {
            Self::Json => serde_json::to_vec(value).map_err(TransportError::from),
            #[cfg(feature = "msgpack")]
            Self::MessagePack => rmp_serde::to_vec_named(value).map_err(TransportError::from),
        }
    }

    /// Deserialize a value using this format.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if the bytes do not decode as `T`.
    pub fn deserialize<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, TransportError> {
        match self {
            Self::Json => serde_json::from_slice(bytes).map_err(TransportError::from),
            #[cfg(feature = "msgpack")]
            Self::MessagePack => rmp_serde::from_slice(bytes).map_err(TransportError::from),
        }
    }
}

fn map_read_error(e: std::io::Error) -> TransportError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        TransportError::ConnectionClosed
    } else {
        TransportError::Io(e)
    }
}

/// Read a frame header from the stream.
///
/// Returns `(payload_length, frame_type, format)`.
async fn read_header<R>(reader: &mut R) -> Result<(u32, u8, Format), TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await.map_err(map_read_error)?;

    let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let version = header[4];
    let frame_type = header[5];
    let format_byte = header[6];

    if version != PROTOCOL_VERSION {
        return Err(TransportError::Protocol(format!(
            "Unsupported protocol version: {version}, expected {PROTOCOL_VERSION}"
        )));
    }

    if !matches!(frame_type, FRAME_TYPE_ENVELOPE | FRAME_TYPE_HEARTBEAT) {
        return Err(TransportError::Protocol(format!(
            "Unknown frame type: {frame_type:#04x}"
        )));
    }

    let format = Format::from_byte(format_byte).ok_or_else(|| {
        TransportError::Protocol(format!("Unknown serialization format: {format_byte:#04x}"))
    })?;

    Ok((length, frame_type, format))
}

/// Read a complete frame from the stream.
///
/// Returns the frame type, format, and payload bytes.
///
/// # Errors
///
/// [`TransportError::ConnectionClosed`] on a clean EOF, [`TransportError::Protocol`] for
/// a malformed header or a payload above `max_size` (or the 16 MiB hard cap).
pub async fn read_frame<R>(
    reader: &mut R,
    max_size: usize,
) -> Result<(u8, Format, Vec<u8>), TransportError>
where
    R: AsyncRead + Unpin,
{
    let (length, frame_type, format) = read_header(reader).await?;
    let length = length as usize;

    if length > max_size.min(MAX_FRAME_SIZE) {
        return Err(TransportError::Protocol(format!(
            "Frame size {length} exceeds maximum {}",
            max_size.min(MAX_FRAME_SIZE)
        )));
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await.map_err(map_read_error)?;

    Ok((frame_type, format, payload))
}

/// Write a frame to the stream using the specified format.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the write or flush fails.
pub async fn write_frame<W>(
    writer: &mut W,
    frame_type: u8,
    format: Format,
    payload: &[u8],
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let length: u32 = payload
        .len()
        .try_into()
        .map_err(|_| TransportError::Protocol("Payload too large for u32".to_string()))?;

    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&length.to_be_bytes());
    header[4] = PROTOCOL_VERSION;
    header[5] = frame_type;
    header[6] = format.to_byte();

    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Write an empty heartbeat frame.
///
/// # Errors
///
/// Returns [`TransportError::Io`] if the write fails.
pub async fn write_heartbeat<W>(writer: &mut W) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    write_frame(writer, FRAME_TYPE_HEARTBEAT, Format::Json, &[]).await
}

/// Encode an envelope as a frame payload, enforcing `max_size`.
///
/// # Errors
///
/// [`TransportError::Serialization`] if encoding fails, [`TransportError::Protocol`] if
/// the encoded envelope would be rejected by the receiver's size limit.
pub fn encode_envelope<M: Serialize>(
    envelope: &Envelope<M>,
    format: Format,
    max_size: usize,
) -> Result<Vec<u8>, TransportError> {
    let payload = format.serialize(envelope)?;
    let limit = max_size.min(MAX_FRAME_SIZE);
    if payload.len() > limit {
        return Err(TransportError::Protocol(format!(
            "Envelope of {} bytes exceeds maximum {limit}",
            payload.len()
        )));
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::message::Pid;

    #[tokio::test]
    async fn test_write_read_frame() {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, FRAME_TYPE_ENVELOPE, Format::Json, b"test payload")
            .await
            .unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE + 12);
        assert_eq!(&buffer[..4], &12u32.to_be_bytes());

        let mut reader = Cursor::new(buffer);
        let (frame_type, format, payload) = read_frame(&mut reader, 1024).await.unwrap();
        assert_eq!(frame_type, FRAME_TYPE_ENVELOPE);
        assert_eq!(format, Format::Json);
        assert_eq!(payload, b"test payload");
    }

    #[tokio::test]
    async fn test_envelope_frame() {
        let envelope = Envelope::new(
            Pid::new("127.0.0.1:4000", "server/primary"),
            vec![1u8, 2, 3],
            Some(Pid::new("127.0.0.1:5000", "client/bob")),
        );
        let payload = encode_envelope(&envelope, Format::Json, 1024).unwrap();

        let mut buffer = Vec::new();
        write_frame(&mut buffer, FRAME_TYPE_ENVELOPE, Format::Json, &payload)
            .await
            .unwrap();
        let (_, format, bytes) = read_frame(&mut Cursor::new(buffer), 1024).await.unwrap();
        let decoded: Envelope<Vec<u8>> = format.deserialize(&bytes).unwrap();

        assert_eq!(decoded.destination, envelope.destination);
        assert_eq!(decoded.sender, envelope.sender);
        assert_eq!(decoded.payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_heartbeat_frame() {
        let mut buffer = Vec::new();
        write_heartbeat(&mut buffer).await.unwrap();

        let (frame_type, _, payload) = read_frame(&mut Cursor::new(buffer), 0).await.unwrap();
        assert_eq!(frame_type, FRAME_TYPE_HEARTBEAT);
        assert!(payload.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_protocol_version() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&4u32.to_be_bytes());
        buffer.push(0xFF);
        buffer.push(FRAME_TYPE_ENVELOPE);
        buffer.push(Format::JSON_BYTE);
        buffer.extend_from_slice(b"test");

        let result = read_frame(&mut Cursor::new(buffer), 1024).await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_invalid_frame_type() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&4u32.to_be_bytes());
        buffer.push(PROTOCOL_VERSION);
        buffer.push(0xFF);
        buffer.push(Format::JSON_BYTE);
        buffer.extend_from_slice(b"test");

        let result = read_frame(&mut Cursor::new(buffer), 1024).await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_invalid_format() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&4u32.to_be_bytes());
        buffer.push(PROTOCOL_VERSION);
        buffer.push(FRAME_TYPE_ENVELOPE);
        buffer.push(0x7F);
        buffer.extend_from_slice(b"test");

        let result = read_frame(&mut Cursor::new(buffer), 1024).await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_frame_too_large() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&2000u32.to_be_bytes());
        buffer.push(PROTOCOL_VERSION);
        buffer.push(FRAME_TYPE_ENVELOPE);
        buffer.push(Format::JSON_BYTE);

        let result = read_frame(&mut Cursor::new(buffer), 1024).await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_clean_eof_is_connection_closed() {
        let result = read_frame(&mut Cursor::new(Vec::new()), 1024).await;
        assert!(matches!(result, Err(TransportError::ConnectionClosed)));
    }

    #[test]
    fn test_oversized_envelope_rejected_before_write() {
        let envelope = Envelope::new(Pid::new("a:1", "x"), "y".repeat(64), None);
        let result = encode_envelope(&envelope, Format::Json, 16);
        assert!(matches!(result, Err(TransportError::Protocol(_))));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(Format::Json.to_byte(), Format::JSON_BYTE);
        assert_eq!(Format::from_byte(Format::JSON_BYTE), Some(Format::Json));
        assert_eq!(Format::from_byte(0x00), None);
    }

    #[cfg(feature = "msgpack")]
    #[test]
    fn test_messagepack_envelope() {
        let envelope = Envelope::new(Pid::new("a:1", "x"), 42u64, None);
        let bytes = encode_envelope(&envelope, Format::MessagePack, 1024).unwrap();
        let decoded: Envelope<u64> = Format::MessagePack.deserialize(&bytes).unwrap();
        assert_eq!(decoded.payload, 42);
    }
}
