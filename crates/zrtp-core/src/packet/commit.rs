use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use super::{check_exact, MessageBody, HASH_IMAGE_LEN, MAC_LEN, ZID_LEN};
use crate::config::AlgorithmId;
use crate::error::DecodeError;

/// Length of the hash commitment value
pub const HVI_LEN: usize = 32;

/// Commit body: H2, ZID, five algorithm ids, hvi, MAC
pub const COMMIT_BODY_LEN: usize = HASH_IMAGE_LEN + ZID_LEN + 5 * 4 + HVI_LEN + MAC_LEN;

/// Commit message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub h2: [u8; HASH_IMAGE_LEN],
    pub zid: [u8; ZID_LEN],
    pub hash: AlgorithmId,
    pub cipher: AlgorithmId,
    pub auth_length: AlgorithmId,
    pub pub_key: AlgorithmId,
    pub sas: AlgorithmId,
    /// Hash commitment, compared on Commit contention
    pub hvi: [u8; HVI_LEN],
    pub mac: [u8; MAC_LEN],
}

fn read_id(buf: &mut &[u8]) -> AlgorithmId {
    let mut id = [0u8; 4];
    buf.copy_to_slice(&mut id);
    AlgorithmId(id)
}

impl MessageBody for Commit {
    fn body_len(&self) -> usize {
        COMMIT_BODY_LEN
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.h2);
        buf.put_slice(&self.zid);
        buf.put_slice(self.hash.as_bytes());
        buf.put_slice(self.cipher.as_bytes());
        buf.put_slice(self.auth_length.as_bytes());
        buf.put_slice(self.pub_key.as_bytes());
        buf.put_slice(self.sas.as_bytes());
        buf.put_slice(&self.hvi);
        buf.put_slice(&self.mac);
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        check_exact(body, COMMIT_BODY_LEN)?;

        let mut buf = body;
        let mut h2 = [0u8; HASH_IMAGE_LEN];
        buf.copy_to_slice(&mut h2);
        let mut zid = [0u8; ZID_LEN];
        buf.copy_to_slice(&mut zid);
        let hash = read_id(&mut buf);
        let cipher = read_id(&mut buf);
        let auth_length = read_id(&mut buf);
        let pub_key = read_id(&mut buf);
        let sas = read_id(&mut buf);
        debug!("Commit algorithms: {} {} {} {} {}", hash, cipher, auth_length, pub_key, sas);
        let mut hvi = [0u8; HVI_LEN];
        buf.copy_to_slice(&mut hvi);
        let mut mac = [0u8; MAC_LEN];
        buf.copy_to_slice(&mut mac);

        Ok(Self { h2, zid, hash, cipher, auth_length, pub_key, sas, hvi, mac })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_layout() {
        let commit = Commit {
            h2: [0x22; HASH_IMAGE_LEN],
            zid: [0x5A; ZID_LEN],
            hash: AlgorithmId::new(b"S256"),
            cipher: AlgorithmId::new(b"AES1"),
            auth_length: AlgorithmId::new(b"HS32"),
            pub_key: AlgorithmId::new(b"DH3k"),
            sas: AlgorithmId::new(b"B32 "),
            hvi: [0x77; HVI_LEN],
            mac: [0x01; MAC_LEN],
        };
        let mut buf = BytesMut::new();
        commit.write_body(&mut buf);
        assert_eq!(buf.len(), COMMIT_BODY_LEN);
        // hvi starts after H2, ZID and the algorithm ids
        assert_eq!(&buf[56..60], b"DH3k");
        assert_eq!(buf[64], 0x77);

        let parsed = Commit::parse_body(&buf).unwrap();
        assert_eq!(parsed, commit);
    }

    #[test]
    fn test_wrong_size() {
        let err = Commit::parse_body(&[0u8; COMMIT_BODY_LEN - 4]).unwrap_err();
        assert!(matches!(err, DecodeError::LengthMismatch { .. }));
    }
}
