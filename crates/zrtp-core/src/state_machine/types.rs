use std::fmt;
use std::time::Duration;

use super::context::Severity;
use crate::packet::{ErrorCode, MessageType};
use crate::timer::TimerId;

/// Handshake states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZrtpState {
    /// Not started, or reset after a failure
    Initial,
    /// Hello sent, waiting for the peer's Hello or HelloACK
    Detect,
    /// Our Hello was acknowledged, waiting for the peer's Hello
    AckDetected,
    /// HelloACK sent, waiting for the peer's Commit
    WaitCommit,
    /// Commit sent, waiting for DHPart1
    CommitSent,
    /// DHPart1 sent, waiting for DHPart2
    WaitDhPart2,
    /// DHPart2 sent, waiting for Confirm1
    WaitConfirm1,
    /// Confirm1 sent, waiting for Confirm2
    WaitConfirm2,
    /// Confirm2 sent, waiting for Conf2ACK
    WaitConfAck,
    /// GoClear sent, waiting for ClearACK
    WaitClearAck,
    /// Keys agreed, SRTP active
    SecureState,
    /// Error sent, waiting for ErrorACK
    WaitErrorAck,
}

impl fmt::Display for ZrtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Role taken in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

/// Input to the state machine
///
/// The packet bytes are borrowed for the duration of one
/// `process_event` call only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// Start the handshake by sending Hello
    SessionStart,
    /// Raw ZRTP packet received from the peer
    PacketReceived(&'a [u8]),
    /// A retransmission timer expired
    TimerFired(TimerId),
    /// Local request to leave secure mode
    GoClearRequested,
    /// Stream is being shut down
    Close,
}

impl Event<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStart => "SessionStart",
            Event::PacketReceived(_) => "PacketReceived",
            Event::TimerFired(_) => "TimerFired",
            Event::GoClearRequested => "GoClearRequested",
            Event::Close => "Close",
        }
    }
}

/// Handler verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// The current handshake attempt failed
    Fail,
}

/// Side effect performed while handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A packet was handed to the transport. `retained` packets stay in the
    /// outstanding slot for retransmission.
    Sent { message: MessageType, retained: bool },
    /// The transport refused a packet
    SendFailed { message: MessageType },
    TimerStarted { timer: TimerId, interval: Duration },
    TimerRescheduled { timer: TimerId, interval: Duration },
    TimerExhausted { timer: TimerId },
    TimerCancelled { timer: TimerId },
    /// The outstanding packet was dropped from the slot
    PacketReleased { message: MessageType, owned: bool },
    SrtpEnabled,
    SrtpDisabled,
    Notified { severity: Severity, message: String },
    /// The peer sent an Error message
    PeerError(ErrorCode),
}

/// Result of processing one event
#[derive(Debug, Clone)]
pub struct ProcessEventResult {
    pub old_state: ZrtpState,
    pub new_state: ZrtpState,
    pub outcome: Outcome,
    pub actions: Vec<Action>,
}

impl ProcessEventResult {
    pub fn transitioned(&self) -> bool {
        self.old_state != self.new_state
    }

    pub fn is_fail(&self) -> bool {
        self.outcome == Outcome::Fail
    }

    /// Message types sent while handling the event, in order
    pub fn sent(&self) -> Vec<MessageType> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Sent { message, .. } => Some(*message),
                _ => None,
            })
            .collect()
    }

    /// Number of outstanding packets released
    pub fn released(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a, Action::PacketReleased { .. }))
            .count()
    }
}
