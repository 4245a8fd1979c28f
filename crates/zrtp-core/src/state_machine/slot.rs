//! The single outstanding packet awaiting acknowledgment
//!
//! Hello, Commit, DHPart, Confirm, GoClear and Error packets are built per
//! handshake and owned by the slot. The acknowledgments are shared static
//! encodings, referenced but never freed here.

use tracing::trace;

use crate::packet::{EncodedPacket, MessageType};

/// A packet held for (re)transmission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPacket {
    Owned(EncodedPacket),
    Static(&'static EncodedPacket),
}

impl OutboundPacket {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            OutboundPacket::Owned(p) => p.as_bytes(),
            OutboundPacket::Static(p) => p.as_bytes(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundPacket::Owned(p) => p.message_type(),
            OutboundPacket::Static(p) => p.message_type(),
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, OutboundPacket::Owned(_))
    }
}

impl From<EncodedPacket> for OutboundPacket {
    fn from(packet: EncodedPacket) -> Self {
        OutboundPacket::Owned(packet)
    }
}

impl From<&'static EncodedPacket> for OutboundPacket {
    fn from(packet: &'static EncodedPacket) -> Self {
        OutboundPacket::Static(packet)
    }
}

/// Counters kept by a slot over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub installed: u64,
    pub owned_released: u64,
    pub static_released: u64,
}

/// Record of a packet leaving the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    pub message: MessageType,
    pub owned: bool,
}

#[derive(Debug, Default)]
pub struct PacketSlot {
    current: Option<OutboundPacket>,
    stats: SlotStats,
}

impl PacketSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a packet, releasing whatever was held before
    pub fn install(&mut self, packet: OutboundPacket) -> Option<Released> {
        let released = self.release();
        trace!("Installing outstanding {} packet", packet.message_type());
        self.stats.installed += 1;
        self.current = Some(packet);
        released
    }

    /// Drop the held packet, if any
    pub fn release(&mut self) -> Option<Released> {
        let packet = self.current.take()?;
        let released = Released {
            message: packet.message_type(),
            owned: packet.is_owned(),
        };
        if released.owned {
            self.stats.owned_released += 1;
        } else {
            self.stats.static_released += 1;
        }
        trace!("Released outstanding {} packet (owned: {})", released.message, released.owned);
        Some(released)
    }

    pub fn get(&self) -> Option<&OutboundPacket> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn stats(&self) -> SlotStats {
        self.stats
    }
}
