use bytes::{Buf, BufMut, BytesMut};
use tracing::debug;

use super::header::{HEADER_LEN, ZRTP_WORD_SIZE};
use super::{check_len, MessageBody, HASH_IMAGE_LEN, MAC_LEN, ZID_LEN};
use crate::config::{AlgorithmCategory, AlgorithmId, ZrtpConfig, CLIENT_ID_LEN, MAX_ALGORITHMS};
use crate::error::{DecodeError, EncodeError};

/// Protocol version advertised in Hello
pub const ZRTP_VERSION: &[u8; 4] = b"1.10";

/// Fixed part of the Hello body: version, client id, H3, ZID, flags/counts
pub const HELLO_FIXED_LEN: usize = 4 + CLIENT_ID_LEN + HASH_IMAGE_LEN + ZID_LEN + 4;

/// Bit offset of the hash count in the flags/counts word
pub const HASH_COUNT_SHIFT: u32 = 12;
/// Bit offset of the cipher count
pub const CIPHER_COUNT_SHIFT: u32 = 16;
/// Bit offset of the auth length count
pub const AUTH_COUNT_SHIFT: u32 = 20;
/// Bit offset of the public key count
pub const PUBKEY_COUNT_SHIFT: u32 = 24;
/// Bit offset of the SAS type count
pub const SAS_COUNT_SHIFT: u32 = 28;

const COUNT_MASK: u32 = 0xF;

/// SAS signing flag
pub const FLAG_SAS_SIGNING: u32 = 0x1;
/// MitM (PBX) flag
pub const FLAG_MITM: u32 = 0x2;
/// Passive flag
pub const FLAG_PASSIVE: u32 = 0x4;

fn count_shift(category: AlgorithmCategory) -> u32 {
    match category {
        AlgorithmCategory::Hash => HASH_COUNT_SHIFT,
        AlgorithmCategory::Cipher => CIPHER_COUNT_SHIFT,
        AlgorithmCategory::AuthLength => AUTH_COUNT_SHIFT,
        AlgorithmCategory::PubKey => PUBKEY_COUNT_SHIFT,
        AlgorithmCategory::Sas => SAS_COUNT_SHIFT,
    }
}

/// Hello message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hello {
    pub version: [u8; 4],
    pub client_id: [u8; CLIENT_ID_LEN],
    pub h3: [u8; HASH_IMAGE_LEN],
    pub zid: [u8; ZID_LEN],
    pub sas_signing: bool,
    pub mitm: bool,
    pub passive: bool,
    pub hashes: Vec<AlgorithmId>,
    pub ciphers: Vec<AlgorithmId>,
    pub auth_lengths: Vec<AlgorithmId>,
    pub pub_keys: Vec<AlgorithmId>,
    pub sas_types: Vec<AlgorithmId>,
    pub mac: [u8; MAC_LEN],
}

impl Hello {
    /// Build a Hello advertising the full configured algorithm lists
    pub fn from_config(config: &ZrtpConfig, zid: [u8; ZID_LEN], h3: [u8; HASH_IMAGE_LEN]) -> Self {
        Self {
            version: *ZRTP_VERSION,
            client_id: config.client_id_bytes(),
            h3,
            zid,
            sas_signing: config.sas_signing,
            mitm: config.mitm_mode,
            passive: config.passive,
            hashes: config.hash.clone(),
            ciphers: config.cipher.clone(),
            auth_lengths: config.auth_length.clone(),
            pub_keys: config.pub_key.clone(),
            sas_types: config.sas.clone(),
            mac: [0u8; MAC_LEN],
        }
    }

    pub fn algorithms(&self, category: AlgorithmCategory) -> &[AlgorithmId] {
        match category {
            AlgorithmCategory::Hash => &self.hashes,
            AlgorithmCategory::Cipher => &self.ciphers,
            AlgorithmCategory::AuthLength => &self.auth_lengths,
            AlgorithmCategory::PubKey => &self.pub_keys,
            AlgorithmCategory::Sas => &self.sas_types,
        }
    }

    fn algorithms_mut(&mut self, category: AlgorithmCategory) -> &mut Vec<AlgorithmId> {
        match category {
            AlgorithmCategory::Hash => &mut self.hashes,
            AlgorithmCategory::Cipher => &mut self.ciphers,
            AlgorithmCategory::AuthLength => &mut self.auth_lengths,
            AlgorithmCategory::PubKey => &mut self.pub_keys,
            AlgorithmCategory::Sas => &mut self.sas_types,
        }
    }

    /// Flags and list counts packed into one word. Counts above 15 do not
    /// fit; [`MessageBody::check_encodable`] rejects them before encoding.
    pub fn flags_and_counts(&self) -> u32 {
        let mut word = 0u32;
        if self.sas_signing {
            word |= FLAG_SAS_SIGNING;
        }
        if self.mitm {
            word |= FLAG_MITM;
        }
        if self.passive {
            word |= FLAG_PASSIVE;
        }
        for category in AlgorithmCategory::ALL {
            word |= (self.algorithms(category).len() as u32 & COUNT_MASK) << count_shift(category);
        }
        word
    }

    /// Byte offset of a category's list within the body
    pub fn list_offset(&self, category: AlgorithmCategory) -> usize {
        let mut offset = HELLO_FIXED_LEN;
        for c in AlgorithmCategory::ALL {
            if c == category {
                break;
            }
            offset += self.algorithms(c).len() * ZRTP_WORD_SIZE;
        }
        offset
    }

    /// Whether the peer offers `id` in `category`
    pub fn supports(&self, category: AlgorithmCategory, id: &AlgorithmId) -> bool {
        self.algorithms(category).contains(id)
    }
}

impl MessageBody for Hello {
    fn body_len(&self) -> usize {
        let listed: usize = AlgorithmCategory::ALL
            .iter()
            .map(|c| self.algorithms(*c).len())
            .sum();
        HELLO_FIXED_LEN + listed * ZRTP_WORD_SIZE + MAC_LEN
    }

    fn check_encodable(&self) -> Result<(), EncodeError> {
        for category in AlgorithmCategory::ALL {
            let count = self.algorithms(category).len();
            if count > MAX_ALGORITHMS {
                debug!("Hello lists {} {} algorithms, at most {} fit", count, category.name(), MAX_ALGORITHMS);
                return Err(EncodeError::TooManyAlgorithms {
                    category: category.name(),
                    count,
                });
            }
        }
        Ok(())
    }

    fn write_body(&self, buf: &mut BytesMut) {
        buf.put_slice(&self.version);
        buf.put_slice(&self.client_id);
        buf.put_slice(&self.h3);
        buf.put_slice(&self.zid);
        buf.put_u32(self.flags_and_counts());
        for category in AlgorithmCategory::ALL {
            for id in self.algorithms(category) {
                buf.put_slice(id.as_bytes());
            }
        }
        buf.put_slice(&self.mac);
    }

    fn parse_body(body: &[u8]) -> Result<Self, DecodeError> {
        debug!("Parsing Hello body with {} bytes", body.len());
        check_len(body, HELLO_FIXED_LEN)?;

        let mut buf = body;
        let mut hello = Hello {
            version: [0u8; 4],
            client_id: [0u8; CLIENT_ID_LEN],
            h3: [0u8; HASH_IMAGE_LEN],
            zid: [0u8; ZID_LEN],
            sas_signing: false,
            mitm: false,
            passive: false,
            hashes: Vec::new(),
            ciphers: Vec::new(),
            auth_lengths: Vec::new(),
            pub_keys: Vec::new(),
            sas_types: Vec::new(),
            mac: [0u8; MAC_LEN],
        };
        buf.copy_to_slice(&mut hello.version);
        buf.copy_to_slice(&mut hello.client_id);
        buf.copy_to_slice(&mut hello.h3);
        buf.copy_to_slice(&mut hello.zid);

        let word = buf.get_u32();
        hello.sas_signing = word & FLAG_SAS_SIGNING != 0;
        hello.mitm = word & FLAG_MITM != 0;
        hello.passive = word & FLAG_PASSIVE != 0;
        debug!("Hello flags/counts word: 0x{:08x}", word);

        // List offsets come from the counts alone; the declared length only
        // bounds them.
        let mut offset = HELLO_FIXED_LEN;
        for category in AlgorithmCategory::ALL {
            let count = ((word >> count_shift(category)) & COUNT_MASK) as usize;
            let end = offset + count * ZRTP_WORD_SIZE;
            if end > body.len() {
                debug!("{} list of {} entries overruns body of {} bytes", category.name(), count, body.len());
                return Err(DecodeError::CountExceedsBuffer {
                    category: category.name(),
                    count,
                });
            }
            let list = hello.algorithms_mut(category);
            for chunk in body[offset..end].chunks_exact(ZRTP_WORD_SIZE) {
                list.push(AlgorithmId([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
            offset = end;
        }

        let expected = offset + MAC_LEN;
        if body.len() != expected {
            return Err(DecodeError::LengthMismatch {
                declared: (HEADER_LEN + body.len()) / ZRTP_WORD_SIZE,
                expected: (HEADER_LEN + expected) / ZRTP_WORD_SIZE,
            });
        }
        hello.mac.copy_from_slice(&body[offset..expected]);

        Ok(hello)
    }
}
