//! TCP protocol for zap-server client/server communication.
//!
//! Wire format: `[type: u8][length: u32 big-endian][payload: bytes]`
//!
//! Handshake frames carry JSON payloads; command and reply frames carry the
//! raw UTF-8 text of one command line or one result.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Frame type byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    // Handshake frames (JSON payload)
    Challenge = 0x01,
    ChallengeResponse = 0x02,
    Welcome = 0x03,

    // Request/response frames (UTF-8 payload)
    Command = 0x10,
    Reply = 0x11,

    Error = 0x7F,
}

impl FrameType {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Challenge),
            0x02 => Some(Self::ChallengeResponse),
            0x03 => Some(Self::Welcome),
            0x10 => Some(Self::Command),
            0x11 => Some(Self::Reply),
            0x7F => Some(Self::Error),
            _ => None,
        }
    }
}

/// Default maximum frame payload size (16 MiB). Prevents OOM on malformed data.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// A protocol frame with a type tag and payload.
#[derive(Debug, Clone)]
pub struct Frame {
    pub frame_type: FrameType,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(frame_type: FrameType, payload: Bytes) -> Self {
        Self {
            frame_type,
            payload,
        }
    }

    /// Create a JSON control frame from a serializable message.
    pub fn control<T: Serialize>(frame_type: FrameType, msg: &T) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(msg)?;
        Ok(Self::new(frame_type, Bytes::from(payload)))
    }

    /// Create a text frame (Command or Reply).
    pub fn text(frame_type: FrameType, text: &str) -> Self {
        Self::new(frame_type, Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Encode this frame into bytes.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5 + self.payload.len());
        buf.put_u8(self.frame_type as u8);
        buf.put_u32(self.payload.len() as u32);
        buf.put(self.payload.as_ref());
        buf.freeze()
    }

    /// Write this frame to an async writer.
    pub async fn write_to<W: AsyncWriteExt + Unpin>(&self, writer: &mut W) -> io::Result<()> {
        let encoded = self.encode();
        writer.write_all(&encoded).await?;
        writer.flush().await
    }

    /// Read a frame from an async reader, rejecting payloads over the default limit.
    pub async fn read_from<R: AsyncReadExt + Unpin>(reader: &mut R) -> io::Result<Self> {
        Self::read_limited(reader, MAX_PAYLOAD_SIZE).await
    }

    /// Read a frame from an async reader, rejecting payloads over `max_payload` bytes.
    pub async fn read_limited<R: AsyncReadExt + Unpin>(
        reader: &mut R,
        max_payload: u32,
    ) -> io::Result<Self> {
        let type_byte = reader.read_u8().await?;
        let frame_type = FrameType::from_u8(type_byte).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown frame type: 0x{:02x}", type_byte),
            )
        })?;

        let length = reader.read_u32().await?;
        if length > max_payload {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame payload too large: {} bytes", length),
            ));
        }

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload).await?;

        Ok(Self {
            frame_type,
            payload: Bytes::from(payload),
        })
    }

    /// Parse the payload as a JSON control message.
    pub fn parse_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    /// Payload as text. Invalid UTF-8 sequences are replaced, never rejected.
    pub fn text_payload(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

// ── Control message types ──────────────────────────────────────────

/// Server → Client: authentication challenge sent right after accept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeMsg {
    /// Base64-encoded random nonce.
    pub nonce: String,
}

/// Client → Server: keyed digest of the challenge nonce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponseMsg {
    /// Base64-encoded HMAC-SHA256 of the decoded nonce.
    pub digest: String,
}

/// Server → Client: handshake accepted, commands may follow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMsg {
    pub server: String,
    pub version: String,
}

impl WelcomeMsg {
    pub fn current() -> Self {
        Self {
            server: "zap-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Server → Client: connection-level error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMsg {
    pub code: String,
    pub message: String,
}
