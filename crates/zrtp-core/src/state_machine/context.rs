//! The port through which the state machine reaches its owner
//!
//! The negotiation context performs all cryptographic work (building and
//! validating packets), the actual transport send and the timer scheduling.
//! Every method is synchronous and must not block.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::slot::OutboundPacket;
use crate::error::EncodeError;
use crate::packet::{
    self, Commit, Confirm, DhPart, EncodedPacket, ErrorCode, ErrorPacket, GoClear, Hello, ZrtpPacket,
};
use crate::timer::TimerId;

/// Direction of SRTP keying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SrtpDirection {
    ForSender,
    ForReceiver,
}

/// Severity of an informational notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Severe,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Notification text used when Hello retransmission gets no answer
pub const NOT_ZRTP_CAPABLE: &str = "Peer is not ZRTP capable";

/// Capabilities the handshake needs from its owner
///
/// `prepare_*` methods that validate a peer packet return the ZRTP error
/// code to send back on failure.
pub trait NegotiationContext {
    fn prepare_hello(&mut self) -> EncodedPacket;

    fn prepare_hello_ack(&mut self) -> OutboundPacket {
        OutboundPacket::Static(packet::hello_ack())
    }

    fn prepare_commit(&mut self, peer_hello: &Hello) -> Result<EncodedPacket, ErrorCode>;

    fn prepare_dh_part1(&mut self, peer_commit: &Commit) -> Result<EncodedPacket, ErrorCode>;

    fn prepare_dh_part2(&mut self, peer_dh_part1: &DhPart) -> Result<EncodedPacket, ErrorCode>;

    fn prepare_confirm1(&mut self, peer_dh_part2: &DhPart) -> Result<EncodedPacket, ErrorCode>;

    fn prepare_confirm2(&mut self, peer_confirm1: &Confirm) -> Result<EncodedPacket, ErrorCode>;

    /// Verify Confirm2 and return the acknowledgment (usually the shared
    /// static Conf2ACK)
    fn prepare_conf2_ack(&mut self, peer_confirm2: &Confirm) -> Result<OutboundPacket, ErrorCode>;

    fn prepare_go_clear(&mut self) -> EncodedPacket;

    fn prepare_clear_ack(&mut self, _peer_go_clear: &GoClear) -> OutboundPacket {
        OutboundPacket::Static(packet::clear_ack())
    }

    fn prepare_error(&mut self, code: ErrorCode) -> Result<EncodedPacket, EncodeError> {
        ZrtpPacket::Error(ErrorPacket { code }).encode()
    }

    fn prepare_error_ack(&mut self, _peer_error: &ErrorPacket) -> OutboundPacket {
        OutboundPacket::Static(packet::error_ack())
    }

    /// Compare our hvi with the one in the peer's Commit
    fn compare_hvi(&self, peer_commit: &Commit) -> Ordering;

    /// Hand a packet to the transport. Returns false on failure.
    fn send_packet(&mut self, packet: &[u8]) -> bool;

    /// Arm the retransmission timer. Returns false on failure.
    fn activate_timer(&mut self, timer: TimerId, interval: Duration) -> bool;

    fn cancel_timer(&mut self) -> bool;

    fn srtp_secrets_ready(&mut self, direction: SrtpDirection);

    fn srtp_secrets_off(&mut self, direction: SrtpDirection);

    /// One-way notification, never affects the handshake
    fn send_info(&mut self, severity: Severity, message: &str);

    /// Hello retransmission ran out without any answer
    fn not_supported_by_peer(&mut self) {
        self.send_info(Severity::Warning, NOT_ZRTP_CAPABLE);
    }

    /// Parameters a secure master stream hands to its slave streams
    fn multi_stream_params(&self) -> Option<Bytes> {
        None
    }

    fn set_multi_stream_params(&mut self, _params: Bytes) {}
}
