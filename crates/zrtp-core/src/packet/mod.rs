//! ZRTP packet codec
//!
//! Every packet is a common header (preamble, length in words, 8-byte
//! message type), a type-specific body and a CRC-32C trailer over
//! everything before it. [`Frame`] validates the framing, [`ZrtpPacket`]
//! decodes the body.

pub mod commit;
pub mod confirm;
pub mod crc;
pub mod dh_part;
pub mod header;
pub mod hello;
pub mod simple;

use bytes::{BufMut, Bytes, BytesMut};
use lazy_static::lazy_static;
use tracing::debug;

use crate::error::{DecodeError, EncodeError};

pub use commit::{Commit, HVI_LEN};
pub use confirm::Confirm;
pub use dh_part::DhPart;
pub use header::{
    Frame, Header, MessageType, HEADER_LEN, HEADER_WORDS, MAX_BODY_LEN, MIN_PACKET_LEN, ZRTP_PREAMBLE,
    ZRTP_WORD_SIZE,
};
pub use hello::{Hello, ZRTP_VERSION};
pub use simple::{ErrorCode, ErrorPacket, GoClear};

/// Length of the H0..H3 hash chain images
pub const HASH_IMAGE_LEN: usize = 32;

/// Length of a ZRTP identifier
pub const ZID_LEN: usize = 12;

/// Length of the truncated message MACs
pub const MAC_LEN: usize = 8;

/// Encoding and decoding of a message body
pub trait MessageBody {
    /// Encoded body size in bytes (always whole words)
    fn body_len(&self) -> usize;

    /// Reject contents the wire format cannot carry
    fn check_encodable(&self) -> Result<(), EncodeError> {
        Ok(())
    }

    fn write_body(&self, buf: &mut BytesMut);

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized;
}

pub(crate) fn check_len(body: &[u8], required: usize) -> Result<(), DecodeError> {
    if body.len() < required {
        debug!("Body too small: need {} but have {}", required, body.len());
        return Err(DecodeError::BufferTooSmall {
            required: HEADER_LEN + required,
            available: HEADER_LEN + body.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_exact(body: &[u8], expected: usize) -> Result<(), DecodeError> {
    if body.len() != expected {
        return Err(DecodeError::LengthMismatch {
            declared: (HEADER_LEN + body.len()) / ZRTP_WORD_SIZE,
            expected: (HEADER_LEN + expected) / ZRTP_WORD_SIZE,
        });
    }
    Ok(())
}

pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(ZRTP_WORD_SIZE) * ZRTP_WORD_SIZE
}

/// A fully encoded packet, CRC included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    message_type: MessageType,
    bytes: Bytes,
}

impl EncodedPacket {
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length field as written in the header
    pub fn length_words(&self) -> usize {
        (self.bytes.len() - crc::CRC_LEN) / ZRTP_WORD_SIZE
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

fn frame_packet(
    message_type: MessageType,
    body: Option<&dyn MessageBody>,
) -> Result<EncodedPacket, EncodeError> {
    let header = match body {
        Some(body) => {
            body.check_encodable()?;
            Header::for_body(message_type, body.body_len())?
        }
        None => Header::empty(message_type),
    };
    Ok(write_frame(header, body))
}

fn write_frame(header: Header, body: Option<&dyn MessageBody>) -> EncodedPacket {
    let message_type = header.message_type;
    let mut buf = BytesMut::with_capacity(header.packet_len());
    header.write(&mut buf);
    if let Some(body) = body {
        body.write_body(&mut buf);
    }
    let sum = crc::checksum(&buf);
    buf.put_u32(sum);
    debug!("Encoded {} packet: {} bytes, crc 0x{:08x}", message_type, buf.len(), sum);
    EncodedPacket {
        message_type,
        bytes: buf.freeze(),
    }
}

/// Decoded ZRTP message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZrtpPacket {
    Hello(Hello),
    HelloAck,
    Commit(Commit),
    DhPart1(DhPart),
    DhPart2(DhPart),
    Confirm1(Confirm),
    Confirm2(Confirm),
    Conf2Ack,
    GoClear(GoClear),
    ClearAck,
    Error(ErrorPacket),
    ErrorAck,
}

impl ZrtpPacket {
    pub fn message_type(&self) -> MessageType {
        match self {
            ZrtpPacket::Hello(_) => MessageType::Hello,
            ZrtpPacket::HelloAck => MessageType::HelloAck,
            ZrtpPacket::Commit(_) => MessageType::Commit,
            ZrtpPacket::DhPart1(_) => MessageType::DhPart1,
            ZrtpPacket::DhPart2(_) => MessageType::DhPart2,
            ZrtpPacket::Confirm1(_) => MessageType::Confirm1,
            ZrtpPacket::Confirm2(_) => MessageType::Confirm2,
            ZrtpPacket::Conf2Ack => MessageType::Conf2Ack,
            ZrtpPacket::GoClear(_) => MessageType::GoClear,
            ZrtpPacket::ClearAck => MessageType::ClearAck,
            ZrtpPacket::Error(_) => MessageType::Error,
            ZrtpPacket::ErrorAck => MessageType::ErrorAck,
        }
    }

    fn body(&self) -> Option<&dyn MessageBody> {
        match self {
            ZrtpPacket::Hello(b) => Some(b),
            ZrtpPacket::Commit(b) => Some(b),
            ZrtpPacket::DhPart1(b) | ZrtpPacket::DhPart2(b) => Some(b),
            ZrtpPacket::Confirm1(b) | ZrtpPacket::Confirm2(b) => Some(b),
            ZrtpPacket::GoClear(b) => Some(b),
            ZrtpPacket::Error(b) => Some(b),
            ZrtpPacket::HelloAck
            | ZrtpPacket::Conf2Ack
            | ZrtpPacket::ClearAck
            | ZrtpPacket::ErrorAck => None,
        }
    }

    /// Encode with header and CRC. Fails for a Hello listing more than 15
    /// algorithms in a category and for bodies the length field cannot hold.
    pub fn encode(&self) -> Result<EncodedPacket, EncodeError> {
        frame_packet(self.message_type(), self.body())
    }

    /// Decode the body of an already framed packet. The CRC is not checked.
    pub fn from_frame(frame: &Frame<'_>) -> Result<Self, DecodeError> {
        let body = frame.body();
        let packet = match frame.message_type() {
            MessageType::Hello => ZrtpPacket::Hello(Hello::parse_body(body)?),
            MessageType::Commit => ZrtpPacket::Commit(Commit::parse_body(body)?),
            MessageType::DhPart1 => ZrtpPacket::DhPart1(DhPart::parse_body(body)?),
            MessageType::DhPart2 => ZrtpPacket::DhPart2(DhPart::parse_body(body)?),
            MessageType::Confirm1 => ZrtpPacket::Confirm1(Confirm::parse_body(body)?),
            MessageType::Confirm2 => ZrtpPacket::Confirm2(Confirm::parse_body(body)?),
            MessageType::GoClear => ZrtpPacket::GoClear(GoClear::parse_body(body)?),
            MessageType::Error => ZrtpPacket::Error(ErrorPacket::parse_body(body)?),
            MessageType::HelloAck => {
                check_exact(body, 0)?;
                ZrtpPacket::HelloAck
            }
            MessageType::Conf2Ack => {
                check_exact(body, 0)?;
                ZrtpPacket::Conf2Ack
            }
            MessageType::ClearAck => {
                check_exact(body, 0)?;
                ZrtpPacket::ClearAck
            }
            MessageType::ErrorAck => {
                check_exact(body, 0)?;
                ZrtpPacket::ErrorAck
            }
        };
        Ok(packet)
    }

    /// Frame, verify the CRC and decode
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let frame = Frame::parse(data)?;
        frame.verify_crc()?;
        Self::from_frame(&frame)
    }
}

lazy_static! {
    static ref HELLO_ACK: EncodedPacket = write_frame(Header::empty(MessageType::HelloAck), None);
    static ref CONF2_ACK: EncodedPacket = write_frame(Header::empty(MessageType::Conf2Ack), None);
    static ref CLEAR_ACK: EncodedPacket = write_frame(Header::empty(MessageType::ClearAck), None);
    static ref ERROR_ACK: EncodedPacket = write_frame(Header::empty(MessageType::ErrorAck), None);
}

/// Pre-built HelloACK, shared by all streams
pub fn hello_ack() -> &'static EncodedPacket {
    &HELLO_ACK
}

/// Pre-built Conf2ACK
pub fn conf2_ack() -> &'static EncodedPacket {
    &CONF2_ACK
}

/// Pre-built ClearACK
pub fn clear_ack() -> &'static EncodedPacket {
    &CLEAR_ACK
}

/// Pre-built ErrorACK
pub fn error_ack() -> &'static EncodedPacket {
    &ERROR_ACK
}
