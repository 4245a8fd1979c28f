use std::fmt;

use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use super::crc::{self, CRC_LEN};
use crate::error::{DecodeError, EncodeError};

/// ZRTP packet preamble ("PZ")
pub const ZRTP_PREAMBLE: u16 = 0x505A;

/// Size of one ZRTP word in bytes
pub const ZRTP_WORD_SIZE: usize = 4;

/// Size of the message type block
pub const MESSAGE_TYPE_LEN: usize = 8;

/// Preamble, length and message type
pub const HEADER_LEN: usize = 4 + MESSAGE_TYPE_LEN;

/// Smallest valid packet: header plus CRC, empty body
pub const MIN_PACKET_LEN: usize = HEADER_LEN + CRC_LEN;

/// Length field of a packet without a body
pub const HEADER_WORDS: u16 = (HEADER_LEN / ZRTP_WORD_SIZE) as u16;

/// Largest body the 16-bit length field can describe
pub const MAX_BODY_LEN: usize = u16::MAX as usize * ZRTP_WORD_SIZE - HEADER_LEN;

/// ZRTP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    HelloAck,
    Commit,
    DhPart1,
    DhPart2,
    Confirm1,
    Confirm2,
    Conf2Ack,
    GoClear,
    ClearAck,
    Error,
    ErrorAck,
}

impl MessageType {
    pub const ALL: [MessageType; 12] = [
        MessageType::Hello,
        MessageType::HelloAck,
        MessageType::Commit,
        MessageType::DhPart1,
        MessageType::DhPart2,
        MessageType::Confirm1,
        MessageType::Confirm2,
        MessageType::Conf2Ack,
        MessageType::GoClear,
        MessageType::ClearAck,
        MessageType::Error,
        MessageType::ErrorAck,
    ];

    /// Wire tag, space padded to two words
    pub fn tag(&self) -> &'static [u8; MESSAGE_TYPE_LEN] {
        match self {
            MessageType::Hello => b"Hello   ",
            MessageType::HelloAck => b"HelloACK",
            MessageType::Commit => b"Commit  ",
            MessageType::DhPart1 => b"DHPart1 ",
            MessageType::DhPart2 => b"DHPart2 ",
            MessageType::Confirm1 => b"Confirm1",
            MessageType::Confirm2 => b"Confirm2",
            MessageType::Conf2Ack => b"Conf2ACK",
            MessageType::GoClear => b"GoClear ",
            MessageType::ClearAck => b"ClearACK",
            MessageType::Error => b"Error   ",
            MessageType::ErrorAck => b"ErrorACK",
        }
    }

    pub fn from_tag(tag: &[u8; MESSAGE_TYPE_LEN]) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(String::from_utf8_lossy(self.tag()).trim_end())
    }
}

/// Common ZRTP packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Packet length in words, excluding the CRC
    pub length_words: u16,
    pub message_type: MessageType,
}

impl Header {
    /// Header for a packet without a body
    pub const fn empty(message_type: MessageType) -> Self {
        Self {
            length_words: HEADER_WORDS,
            message_type,
        }
    }

    /// Header for a packet whose body is `body_len` bytes. Fails when the
    /// length does not fit the 16-bit word count.
    pub fn for_body(message_type: MessageType, body_len: usize) -> Result<Self, EncodeError> {
        let length_words = (HEADER_LEN + body_len) / ZRTP_WORD_SIZE;
        let length_words = u16::try_from(length_words).map_err(|_| {
            debug!("{} body of {} bytes does not fit the length field", message_type, body_len);
            EncodeError::BodyTooLarge {
                message_type,
                body_len,
                max: MAX_BODY_LEN,
            }
        })?;
        Ok(Self {
            length_words,
            message_type,
        })
    }

    /// Total encoded packet size in bytes, CRC included
    pub fn packet_len(&self) -> usize {
        self.length_words as usize * ZRTP_WORD_SIZE + CRC_LEN
    }

    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(ZRTP_PREAMBLE);
        buf.put_u16(self.length_words);
        buf.put_slice(self.message_type.tag());
    }
}

/// A framed but not yet body-decoded packet
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub header: Header,
    body: &'a [u8],
    covered: &'a [u8],
    crc: u32,
}

impl<'a> Frame<'a> {
    /// Validate preamble, message type and declared length against `data`
    pub fn parse(data: &'a [u8]) -> Result<Self, DecodeError> {
        debug!("Parsing ZRTP frame with {} bytes", data.len());

        if data.len() < MIN_PACKET_LEN {
            debug!("Frame too small: need {} but have {}", MIN_PACKET_LEN, data.len());
            return Err(DecodeError::BufferTooSmall {
                required: MIN_PACKET_LEN,
                available: data.len(),
            });
        }

        let mut buf = data;
        let preamble = buf.get_u16();
        if preamble != ZRTP_PREAMBLE {
            return Err(DecodeError::BadPreamble(preamble));
        }

        let length_words = buf.get_u16();
        let mut tag = [0u8; MESSAGE_TYPE_LEN];
        buf.copy_to_slice(&mut tag);
        let message_type =
            MessageType::from_tag(&tag).ok_or(DecodeError::UnknownMessageType(tag))?;
        debug!("Message type {}, declared length {} words", message_type, length_words);

        let header = Header { length_words, message_type };
        let total = header.packet_len();
        if (length_words as usize) * ZRTP_WORD_SIZE < HEADER_LEN {
            return Err(DecodeError::LengthMismatch {
                declared: length_words as usize,
                expected: HEADER_LEN / ZRTP_WORD_SIZE,
            });
        }
        if data.len() < total {
            return Err(DecodeError::BufferTooSmall {
                required: total,
                available: data.len(),
            });
        }
        if data.len() > total {
            return Err(DecodeError::LengthMismatch {
                declared: length_words as usize,
                expected: (data.len() - CRC_LEN) / ZRTP_WORD_SIZE,
            });
        }

        let crc_offset = total - CRC_LEN;
        let mut trailer = &data[crc_offset..];
        let crc = trailer.get_u32();

        Ok(Self {
            header,
            body: &data[HEADER_LEN..crc_offset],
            covered: &data[..crc_offset],
            crc,
        })
    }

    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// Message body between header and CRC
    pub fn body(&self) -> &'a [u8] {
        self.body
    }

    /// Bytes covered by the CRC (header and body)
    pub fn covered(&self) -> &'a [u8] {
        self.covered
    }

    /// CRC carried in the trailer
    pub fn crc(&self) -> u32 {
        self.crc
    }

    pub fn verify_crc(&self) -> Result<(), DecodeError> {
        let actual = crc::checksum(self.covered);
        if actual != self.crc {
            debug!("CRC mismatch on {}: 0x{:08x} != 0x{:08x}", self.message_type(), self.crc, actual);
            return Err(DecodeError::CrcMismatch { expected: self.crc, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(message_type: MessageType, body: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Header::for_body(message_type, body.len()).unwrap().write(&mut buf);
        buf.put_slice(body);
        let sum = crc::checksum(&buf);
        buf.put_u32(sum);
        buf.to_vec()
    }

    #[test]
    fn test_tags_round_trip() {
        for t in MessageType::ALL {
            assert_eq!(MessageType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(MessageType::from_tag(b"Bogus   "), None);
        assert_eq!(MessageType::DhPart1.to_string(), "DHPart1");
    }

    #[test]
    fn test_parse_empty_body() {
        let data = build(MessageType::HelloAck, &[]);
        assert_eq!(data.len(), MIN_PACKET_LEN);

        let frame = Frame::parse(&data).unwrap();
        assert_eq!(frame.message_type(), MessageType::HelloAck);
        assert_eq!(frame.header.length_words, 3);
        assert!(frame.body().is_empty());
        assert_eq!(frame.covered(), &data[..12]);
        frame.verify_crc().unwrap();
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Frame::parse(&[0x50, 0x5A, 0, 3]),
            Err(DecodeError::BufferTooSmall { required: 16, available: 4 })
        ));

        let mut data = build(MessageType::ClearAck, &[]);
        data[0] = 0x10;
        assert!(matches!(Frame::parse(&data), Err(DecodeError::BadPreamble(0x105A))));

        let mut data = build(MessageType::ClearAck, &[]);
        data[4..12].copy_from_slice(b"Bogus   ");
        assert!(matches!(Frame::parse(&data), Err(DecodeError::UnknownMessageType(_))));

        // Declared length beyond the buffer
        let mut data = build(MessageType::Error, &[0, 0, 0, 0x10]);
        data[3] = 9;
        assert!(matches!(Frame::parse(&data), Err(DecodeError::BufferTooSmall { .. })));

        // Declared length shorter than the header
        let mut data = build(MessageType::ErrorAck, &[]);
        data[3] = 1;
        assert!(matches!(Frame::parse(&data), Err(DecodeError::LengthMismatch { .. })));
    }

    #[test]
    fn test_length_field_limit() {
        let header = Header::for_body(MessageType::DhPart1, MAX_BODY_LEN).unwrap();
        assert_eq!(header.length_words, u16::MAX);

        let err = Header::for_body(MessageType::DhPart1, MAX_BODY_LEN + ZRTP_WORD_SIZE).unwrap_err();
        assert_eq!(
            err,
            EncodeError::BodyTooLarge {
                message_type: MessageType::DhPart1,
                body_len: MAX_BODY_LEN + ZRTP_WORD_SIZE,
                max: MAX_BODY_LEN,
            }
        );

        assert_eq!(Header::empty(MessageType::HelloAck).length_words, 3);
    }

    #[test]
    fn test_crc_mismatch() {
        let mut data = build(MessageType::Error, &[0, 0, 0, 0x10]);
        data[15] ^= 0xFF;
        let frame = Frame::parse(&data).unwrap();
        assert!(matches!(frame.verify_crc(), Err(DecodeError::CrcMismatch { .. })));
    }
}
