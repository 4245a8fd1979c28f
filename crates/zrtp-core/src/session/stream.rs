use std::fmt;

use tracing::debug;

use crate::state_machine::{Event, NegotiationContext, ProcessEventResult, ZrtpState, ZrtpStateMachine};

/// Media stream kinds in a session
///
/// Audio is the master stream and runs the full Diffie-Hellman exchange;
/// video is a slave that reuses the master's key material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Audio,
    Video,
}

impl StreamKind {
    pub fn is_master(&self) -> bool {
        matches!(self, StreamKind::Audio)
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Video => write!(f, "video"),
        }
    }
}

/// One stream of a session: its state machine plus lifecycle flags
pub struct ZrtpStream<C: NegotiationContext> {
    kind: StreamKind,
    machine: ZrtpStateMachine<C>,
    enabled: bool,
    start_pending: bool,
    started: bool,
    stopped: bool,
    previous_state: ZrtpState,
}

impl<C: NegotiationContext> ZrtpStream<C> {
    pub(crate) fn new(kind: StreamKind, machine: ZrtpStateMachine<C>) -> Self {
        Self {
            kind,
            machine,
            enabled: true,
            start_pending: false,
            started: false,
            stopped: false,
            previous_state: ZrtpState::Initial,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> ZrtpState {
        self.machine.state()
    }

    /// State before the last transition
    pub fn previous_state(&self) -> ZrtpState {
        self.previous_state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_start_pending(&self) -> bool {
        self.start_pending
    }

    pub fn is_secure(&self) -> bool {
        self.machine.is_secure()
    }

    pub fn machine(&self) -> &ZrtpStateMachine<C> {
        &self.machine
    }

    pub fn context(&self) -> &C {
        self.machine.context()
    }

    pub fn context_mut(&mut self) -> &mut C {
        self.machine.context_mut()
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_start_pending(&mut self, pending: bool) {
        self.start_pending = pending;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.stopped = true;
        self.started = false;
        self.start_pending = false;
    }

    /// Deliver an event and remember the state it left
    pub(crate) fn deliver(&mut self, event: Event<'_>) -> ProcessEventResult {
        let result = self.machine.process_event(event);
        if result.transitioned() {
            self.previous_state = result.old_state;
        }
        match event {
            Event::SessionStart if !result.is_fail() => {
                self.started = true;
                self.start_pending = false;
            }
            Event::Close => self.started = false,
            _ => {}
        }
        debug!("{} stream handled {}: {} -> {}", self.kind, event.kind(), result.old_state, result.new_state);
        result
    }
}
