//! GoClear and Error bodies, and ZRTP error codes

use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::{Buf, BufMut, BytesMut};

use super::{check_exact, MessageBody, MAC_LEN};
use crate::error::DecodeError;

/// ZRTP protocol error codes carried in Error messages
///
/// Equality and hashing follow the wire value, so `Other(0x10)` equals
/// `MalformedPacket`. Use [`ErrorCode::normalized`] to get the named variant.
#[derive(Debug, Clone, Copy)]
pub enum ErrorCode {
    MalformedPacket,
    CriticalSoftwareError,
    UnsupportedVersion,
    HelloComponentsMismatch,
    UnsupportedHash,
    UnsupportedCipher,
    UnsupportedPubKey,
    UnsupportedAuthTag,
    UnsupportedSas,
    NoSharedSecret,
    BadDhPublicValue,
    HviMismatch,
    UntrustedMitm,
    BadConfirmMac,
    NonceReuse,
    EqualZids,
    SsrcCollision,
    ServiceUnavailable,
    ProtocolTimeout,
    GoClearNotAllowed,
    /// A code without a named variant
    Other(u32),
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::MalformedPacket => 0x10,
            ErrorCode::CriticalSoftwareError => 0x20,
            ErrorCode::UnsupportedVersion => 0x30,
            ErrorCode::HelloComponentsMismatch => 0x40,
            ErrorCode::UnsupportedHash => 0x51,
            ErrorCode::UnsupportedCipher => 0x52,
            ErrorCode::UnsupportedPubKey => 0x53,
            ErrorCode::UnsupportedAuthTag => 0x54,
            ErrorCode::UnsupportedSas => 0x55,
            ErrorCode::NoSharedSecret => 0x56,
            ErrorCode::BadDhPublicValue => 0x61,
            ErrorCode::HviMismatch => 0x62,
            ErrorCode::UntrustedMitm => 0x63,
            ErrorCode::BadConfirmMac => 0x70,
            ErrorCode::NonceReuse => 0x80,
            ErrorCode::EqualZids => 0x90,
            ErrorCode::SsrcCollision => 0x91,
            ErrorCode::ServiceUnavailable => 0xA0,
            ErrorCode::ProtocolTimeout => 0xB0,
            ErrorCode::GoClearNotAllowed => 0x100,
            ErrorCode::Other(code) => *code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            0x10 => ErrorCode::MalformedPacket,
            0x20 => ErrorCode::CriticalSoftwareError,
            0x30 => ErrorCode::UnsupportedVersion,
            0x40 => ErrorCode::HelloComponentsMismatch,
            0x51 => ErrorCode::UnsupportedHash,
            0x52 => ErrorCode::UnsupportedCipher,
            0x53 => ErrorCode::UnsupportedPubKey,
            0x54 => ErrorCode::UnsupportedAuthTag,
            0x55 => ErrorCode::UnsupportedSas,
            0x56 => ErrorCode::NoSharedSecret,
            0x61 => ErrorCode::BadDhPublicValue,
            0x62 => ErrorCode::HviMismatch,
            0x63 => ErrorCode::UntrustedMitm,
            0x70 => ErrorCode::BadConfirmMac,
            0x80 => ErrorCode::NonceReuse,
            0x90 => ErrorCode::EqualZids,
            0x91 => ErrorCode::SsrcCollision,
            0xA0 => ErrorCode::ServiceUnavailable,
            0xB0 => ErrorCode::ProtocolTimeout,
            0x100 => ErrorCode::GoClearNotAllowed,
            other => ErrorCode::Other(other),
        }
    }

    /// The named variant for this wire value, when one exists
    pub fn normalized(&self) -> Self {
        Self::from_code(self.code())
    }
}

impl From<u32> for ErrorCode {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}

impl PartialEq for ErrorCode {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for ErrorCode {}

impl Hash for ErrorCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:x})", self.normalized(), self.code())
    }
}

/// GoClear message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoClear {
    pub clear_mac: [u8; MAC_LEN],
}

impl MessageBody for GoClear {
    fn body_len(&self) -> usize {
        MAC_LEN
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.clear_mac);
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        check_exact(body, MAC_LEN)?;
        let mut clear_mac = [0u8; MAC_LEN];
        clear_mac.copy_from_slice(body);
        Ok(Self { clear_mac })
    }
}

/// Error message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPacket {
    pub code: ErrorCode,
}

impl MessageBody for ErrorPacket {
    fn body_len(&self) -> usize {
        4
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_u32(self.code.code());
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        check_exact(body, 4)?;
        let mut buf = body;
        Ok(Self { code: ErrorCode::from_code(buf.get_u32()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        for code in [0x10, 0x20, 0x30, 0x40, 0x51, 0x56, 0x61, 0x62, 0x63, 0x70, 0x80, 0x90, 0x91, 0xA0, 0xB0, 0x100] {
            let parsed = ErrorCode::from_code(code);
            assert!(!matches!(parsed, ErrorCode::Other(_)), "0x{:x}", code);
            assert_eq!(parsed.code(), code);
        }
        assert_eq!(ErrorCode::from_code(0x999), ErrorCode::Other(0x999));
        assert_eq!(ErrorCode::HviMismatch.to_string(), "HviMismatch (0x62)");
    }

    #[test]
    fn test_unnamed_alias_of_known_code() {
        use std::collections::HashSet;

        let alias = ErrorCode::Other(0x10);
        assert_eq!(alias, ErrorCode::MalformedPacket);
        assert_ne!(alias, ErrorCode::Other(0x11));
        assert!(matches!(alias.normalized(), ErrorCode::MalformedPacket));
        assert_eq!(alias.to_string(), "MalformedPacket (0x10)");
        assert_eq!(ErrorCode::from(0x10), alias);

        let mut seen = HashSet::new();
        seen.insert(ErrorCode::MalformedPacket);
        assert!(!seen.insert(alias));
        assert!(seen.insert(ErrorCode::Other(0x999)));

        // Both spellings encode to the same body
        let mut named = BytesMut::new();
        ErrorPacket { code: ErrorCode::MalformedPacket }.write_body(&mut named);
        let mut unnamed = BytesMut::new();
        ErrorPacket { code: alias }.write_body(&mut unnamed);
        assert_eq!(named, unnamed);
        assert_eq!(ErrorPacket::parse_body(&unnamed).unwrap().code, alias);
    }

    #[test]
    fn test_error_body() {
        let mut buf = BytesMut::new();
        ErrorPacket { code: ErrorCode::UnsupportedCipher }.write_body(&mut buf);
        assert_eq!(&buf[..], &[0, 0, 0, 0x52]);
        assert_eq!(
            ErrorPacket::parse_body(&buf).unwrap().code,
            ErrorCode::UnsupportedCipher
        );
        assert!(ErrorPacket::parse_body(&[0, 0]).is_err());
    }
}
