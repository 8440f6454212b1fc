//! Source RCON framing.
//!
//! Every packet is `size: i32le | id: i32le | type: i32le | body | 0x00 0x00`,
//! where `size` counts everything after itself.

use {
    bytes::{Buf, BufMut, Bytes, BytesMut},
    tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

use crate::{Error, Result};

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Id the server answers with when authentication fails.
pub const AUTH_FAILED_ID: i32 = -1;

/// Longest command body accepted before sending.
pub const MAX_COMMAND_LEN: usize = 4096;

/// Upper bound on an incoming frame. Factorio answers large script output in a
/// single packet, so this is far above the protocol's nominal 4 KiB.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// id + type
const HEADER_LEN: usize = 8;
const TERMINATOR_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: String,
}

impl Packet {
    pub fn new(id: i32, kind: i32, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    /// Serialize including the leading size field.
    pub fn encode(&self) -> Bytes {
        let body = self.body.as_bytes();
        let size = HEADER_LEN + body.len() + TERMINATOR_LEN;
        let mut buf = BytesMut::with_capacity(4 + size);
        buf.put_i32_le(size as i32);
        buf.put_i32_le(self.id);
        buf.put_i32_le(self.kind);
        buf.put_slice(body);
        buf.put_u8(0);
        buf.put_u8(0);
        buf.freeze()
    }

    /// Parse a frame that has already had its size prefix stripped.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        if frame.len() < HEADER_LEN {
            return Err(Error::protocol(format!(
                "frame of {} bytes is shorter than the header",
                frame.len()
            )));
        }
        let mut buf = frame;
        let id = buf.get_i32_le();
        let kind = buf.get_i32_le();
        // Some servers send a single trailing NUL instead of two.
        let body = match buf {
            [rest @ .., 0, 0] => rest,
            [rest @ .., 0] => rest,
            rest => rest,
        };
        Ok(Self {
            id,
            kind,
            body: String::from_utf8_lossy(body).into_owned(),
        })
    }
}

/// Read exactly one packet.
pub async fn read_packet<R>(reader: &mut R) -> Result<Packet>
where
    R: AsyncRead + Unpin,
{
    let size = reader.read_i32_le().await?;
    let len = usize::try_from(size)
        .ok()
        .filter(|len| (HEADER_LEN + TERMINATOR_LEN..=MAX_FRAME_LEN).contains(len))
        .ok_or_else(|| Error::protocol(format!("invalid packet size {size}")))?;

    let mut frame = vec![0u8; len];
    reader.read_exact(&mut frame).await?;
    Packet::decode(&frame)
}

pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&packet.encode()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let bytes = Packet::new(7, SERVERDATA_EXECCOMMAND, "/time").encode();
        assert_eq!(&bytes[..4], &15i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &7i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..17], b"/time");
        assert_eq!(&bytes[17..], &[0, 0]);
    }

    #[test]
    fn decode_accepts_single_terminator() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&3i32.to_le_bytes());
        frame.extend_from_slice(&SERVERDATA_RESPONSE_VALUE.to_le_bytes());
        frame.extend_from_slice(b"ok\0");
        let packet = Packet::decode(&frame).unwrap();
        assert_eq!(packet, Packet::new(3, SERVERDATA_RESPONSE_VALUE, "ok"));
    }

    #[test]
    fn decode_rejects_short_frame() {
        assert!(Packet::decode(&[1, 2, 3]).is_err());
    }

    #[tokio::test]
    async fn read_packet_parses_encoded_frame() {
        let encoded = Packet::new(42, SERVERDATA_RESPONSE_VALUE, "[]").encode();
        let mut reader: &[u8] = &encoded;
        let packet = read_packet(&mut reader).await.unwrap();
        assert_eq!(packet.id, 42);
        assert_eq!(packet.body, "[]");
    }

    #[tokio::test]
    async fn read_packet_rejects_negative_size() {
        let raw = (-5i32).to_le_bytes();
        let mut reader: &[u8] = &raw;
        let err = read_packet(&mut reader).await.unwrap_err();
        assert!(err.to_string().contains("invalid packet size -5"));
    }

    #[tokio::test]
    async fn read_packet_reports_eof() {
        let mut reader: &[u8] = &[];
        let err = read_packet(&mut reader).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
