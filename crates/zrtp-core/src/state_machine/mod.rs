//! ZRTP protocol state machine
//!
//! One [`ZrtpStateMachine`] drives the handshake of one media stream from
//! Hello discovery to the secure state, retransmitting its single
//! outstanding packet on timer expiry and resolving Commit contention.

pub mod context;
pub mod executor;
mod handlers;
pub mod resolver;
pub mod slot;
pub mod types;

pub use context::{NegotiationContext, Severity, SrtpDirection, NOT_ZRTP_CAPABLE};
pub use executor::ZrtpStateMachine;
pub use handlers::{
    GO_CLEAR_RECEIVED, INTERNAL_PROTOCOL_ERROR, RESEND_ERROR, SECURE_STATE_REACHED, SECURITY_CLOSED,
    SEND_ERROR, SEND_ERROR_SRTP, TIMER_ERROR,
};
pub use slot::{OutboundPacket, PacketSlot, SlotStats};
pub use types::{Action, Event, Outcome, ProcessEventResult, Role, ZrtpState};
