use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use super::header::ZRTP_WORD_SIZE;
use super::{check_len, padded_len, MessageBody, HASH_IMAGE_LEN, MAC_LEN};
use crate::error::DecodeError;

/// Length of each retained secret identifier
pub const SECRET_ID_LEN: usize = 8;

/// H1 plus the four secret ids
pub const DH_PART_FIXED_LEN: usize = HASH_IMAGE_LEN + 4 * SECRET_ID_LEN;

/// DHPart1 / DHPart2 message. Both share one layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhPart {
    pub h1: [u8; HASH_IMAGE_LEN],
    pub rs1_id: [u8; SECRET_ID_LEN],
    pub rs2_id: [u8; SECRET_ID_LEN],
    pub aux_secret_id: [u8; SECRET_ID_LEN],
    pub pbx_secret_id: [u8; SECRET_ID_LEN],
    /// Public value. Encoded zero-padded to whole words.
    pub pv: Bytes,
    pub mac: [u8; MAC_LEN],
}

impl MessageBody for DhPart {
    fn body_len(&self) -> usize {
        DH_PART_FIXED_LEN + padded_len(self.pv.len()) + MAC_LEN
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.h1);
        buf.put_slice(&self.rs1_id);
        buf.put_slice(&self.rs2_id);
        buf.put_slice(&self.aux_secret_id);
        buf.put_slice(&self.pbx_secret_id);
        buf.put_slice(&self.pv);
        buf.put_bytes(0, padded_len(self.pv.len()) - self.pv.len());
        buf.put_slice(&self.mac);
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        check_len(body, DH_PART_FIXED_LEN + MAC_LEN)?;

        let mut buf = body;
        let mut h1 = [0u8; HASH_IMAGE_LEN];
        buf.copy_to_slice(&mut h1);
        let mut ids = [[0u8; SECRET_ID_LEN]; 4];
        for id in ids.iter_mut() {
            buf.copy_to_slice(id);
        }

        let pv_len = buf.remaining() - MAC_LEN;
        if pv_len % ZRTP_WORD_SIZE != 0 {
            return Err(DecodeError::InvalidField(format!(
                "public value of {} bytes is not word aligned",
                pv_len
            )));
        }
        debug!("DHPart public value: {} bytes", pv_len);
        let pv = buf.copy_to_bytes(pv_len);
        let mut mac = [0u8; MAC_LEN];
        buf.copy_to_slice(&mut mac);

        let [rs1_id, rs2_id, aux_secret_id, pbx_secret_id] = ids;
        Ok(Self { h1, rs1_id, rs2_id, aux_secret_id, pbx_secret_id, pv, mac })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_value_length_from_body() {
        let part = DhPart {
            h1: [1; HASH_IMAGE_LEN],
            rs1_id: [2; SECRET_ID_LEN],
            rs2_id: [3; SECRET_ID_LEN],
            aux_secret_id: [4; SECRET_ID_LEN],
            pbx_secret_id: [5; SECRET_ID_LEN],
            pv: Bytes::from(vec![0xAB; 64]),
            mac: [6; MAC_LEN],
        };
        let mut buf = BytesMut::new();
        part.write_body(&mut buf);
        assert_eq!(buf.len(), DH_PART_FIXED_LEN + 64 + MAC_LEN);

        let parsed = DhPart::parse_body(&buf).unwrap();
        assert_eq!(parsed.pv.len(), 64);
        assert_eq!(parsed, part);
    }

    #[test]
    fn test_unaligned_public_value_is_padded() {
        let part = DhPart {
            h1: [0; HASH_IMAGE_LEN],
            rs1_id: [0; SECRET_ID_LEN],
            rs2_id: [0; SECRET_ID_LEN],
            aux_secret_id: [0; SECRET_ID_LEN],
            pbx_secret_id: [0; SECRET_ID_LEN],
            pv: Bytes::from_static(&[1, 2, 3]),
            mac: [0; MAC_LEN],
        };
        assert_eq!(part.body_len() % 4, 0);
        let mut buf = BytesMut::new();
        part.write_body(&mut buf);
        let parsed = DhPart::parse_body(&buf).unwrap();
        assert_eq!(&parsed.pv[..], &[1, 2, 3, 0]);
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            DhPart::parse_body(&[0u8; 40]),
            Err(DecodeError::BufferTooSmall { .. })
        ));
    }
}
