//! ZRTP key agreement core for rvoip
//!
//! This crate implements the ZRTP (RFC 6189) handshake engine:
//!
//! - [`packet`]: encoding and decoding of all ZRTP messages with CRC-32C framing
//! - [`timer`]: retransmission backoff policy and a tokio timer driver
//! - [`state_machine`]: the per-stream handshake state machine and the
//!   [`NegotiationContext`] trait through which it reaches crypto,
//!   transport and timers
//! - [`session`]: a master/slave multi-stream session wrapper
//! - [`config`]: algorithm preferences and timer profiles, loadable from YAML
//!
//! Diffie-Hellman computation, key derivation, the ZID cache and SRTP
//! itself live behind the negotiation context.

pub mod config;
pub mod error;
pub mod packet;
pub mod session;
pub mod state_machine;
pub mod timer;

pub use config::{AlgorithmCategory, AlgorithmId, TimerConfig, ZrtpConfig};
pub use error::{ConfigError, DecodeError, EncodeError, Error, Result, SessionError};
pub use packet::{EncodedPacket, ErrorCode, Frame, MessageType, ZrtpPacket};
pub use session::{StreamKind, ZrtpSession, ZrtpStream};
pub use state_machine::{
    Action, Event, NegotiationContext, OutboundPacket, Outcome, ProcessEventResult, Role, Severity,
    SrtpDirection, ZrtpState, ZrtpStateMachine,
};
pub use timer::{Reschedule, RetransmitTimer, TimerId, TimerProfile};
