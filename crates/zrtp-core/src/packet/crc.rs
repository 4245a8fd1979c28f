//! CRC-32C trailer appended to every ZRTP packet

use crc::{Crc, CRC_32_ISCSI};

/// Size of the trailing checksum in bytes
pub const CRC_LEN: usize = 4;

const CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Compute the CRC-32C of `data`
pub fn checksum(data: &[u8]) -> u32 {
    CASTAGNOLI.checksum(data)
}

/// Check `data` against an expected checksum
pub fn verify(data: &[u8], expected: u32) -> bool {
    checksum(data) == expected
}
