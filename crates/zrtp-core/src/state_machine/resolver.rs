//! Commit contention
//!
//! When both peers send a Commit, the side with the numerically greater
//! hvi stays Initiator. Anything else, including a tie, makes us Responder.

use std::cmp::Ordering;

use super::types::Role;
use crate::packet::HVI_LEN;

/// Role for our side given how our hvi compares to the peer's
pub fn resolve(own_vs_peer: Ordering) -> Role {
    match own_vs_peer {
        Ordering::Greater => Role::Initiator,
        Ordering::Equal | Ordering::Less => Role::Responder,
    }
}

/// Compare two hvi values as big-endian unsigned integers
pub fn compare_hvi(own: &[u8; HVI_LEN], peer: &[u8; HVI_LEN]) -> Ordering {
    own.cmp(peer)
}
