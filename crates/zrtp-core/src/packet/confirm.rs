use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{check_len, padded_len, MessageBody, MAC_LEN};
use crate::error::DecodeError;

/// Length of the CFB initialization vector
pub const CFB_IV_LEN: usize = 16;

/// Confirm1 / Confirm2 message
///
/// The encrypted part (H0, flags, cache expiry, optional signature) is
/// opaque at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirm {
    pub confirm_mac: [u8; MAC_LEN],
    pub iv: [u8; CFB_IV_LEN],
    pub encrypted: Bytes,
}

impl MessageBody for Confirm {
    fn body_len(&self) -> usize {
        MAC_LEN + CFB_IV_LEN + padded_len(self.encrypted.len())
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.confirm_mac);
        buf.put_slice(&self.iv);
        buf.put_slice(&self.encrypted);
        buf.put_bytes(0, padded_len(self.encrypted.len()) - self.encrypted.len());
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        check_len(body, MAC_LEN + CFB_IV_LEN)?;

        let mut buf = body;
        let mut confirm_mac = [0u8; MAC_LEN];
        buf.copy_to_slice(&mut confirm_mac);
        let mut iv = [0u8; CFB_IV_LEN];
        buf.copy_to_slice(&mut iv);
        let encrypted = buf.copy_to_bytes(buf.remaining());

        Ok(Self { confirm_mac, iv, encrypted })
    }
}
