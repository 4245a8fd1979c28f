use std::mem;

use tracing::{debug, info, warn};

use super::context::{NegotiationContext, Severity, SrtpDirection};
use super::slot::{OutboundPacket, PacketSlot, SlotStats};
use super::types::{Action, Event, Outcome, ProcessEventResult, Role, ZrtpState};
use crate::config::TimerConfig;
use crate::packet::{Frame, MessageType, ZrtpPacket};
use crate::timer::{Reschedule, RetransmitTimer, TimerId};

/// Decoded input handed to the per-state handlers
#[derive(Debug)]
pub(super) enum Input {
    SessionStart,
    Packet(ZrtpPacket),
    Timer(TimerId),
    Close,
}

/// Result of a timer-driven retransmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Retransmit {
    Resent,
    Failed,
}

/// ZRTP handshake engine for one media stream
///
/// Events are processed one at a time to completion. The machine owns the
/// outstanding packet and the timer bookkeeping; everything else goes
/// through the [`NegotiationContext`].
pub struct ZrtpStateMachine<C: NegotiationContext> {
    pub(super) context: C,
    pub(super) state: ZrtpState,
    pub(super) role: Option<Role>,
    pub(super) slot: PacketSlot,
    t1: RetransmitTimer,
    t2: RetransmitTimer,
    armed: Option<TimerId>,
    srtp_active: bool,
    actions: Vec<Action>,
}

impl<C: NegotiationContext> ZrtpStateMachine<C> {
    pub fn new(context: C) -> Self {
        Self::with_timers(context, TimerConfig::default())
    }

    pub fn with_timers(context: C, timers: TimerConfig) -> Self {
        Self {
            context,
            state: ZrtpState::Initial,
            role: None,
            slot: PacketSlot::new(),
            t1: RetransmitTimer::new(timers.t1),
            t2: RetransmitTimer::new(timers.t2),
            armed: None,
            srtp_active: false,
            actions: Vec::new(),
        }
    }

    pub fn state(&self) -> ZrtpState {
        self.state
    }

    pub fn in_state(&self, state: ZrtpState) -> bool {
        self.state == state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_secure(&self) -> bool {
        self.state == ZrtpState::SecureState
    }

    /// Timer currently armed, if any
    pub fn armed_timer(&self) -> Option<TimerId> {
        self.armed
    }

    /// Message type of the outstanding packet, if any
    pub fn outstanding(&self) -> Option<MessageType> {
        self.slot.get().map(|p| p.message_type())
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.slot.stats()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    /// Process one event to completion
    pub fn process_event(&mut self, event: Event<'_>) -> ProcessEventResult {
        let old_state = self.state;
        debug!("Processing {} in state {}", event.kind(), old_state);

        let outcome = self.dispatch(event);

        let new_state = self.state;
        if old_state != new_state {
            info!("ZRTP state transition: {} -> {} on {}", old_state, new_state, event.kind());
        }
        ProcessEventResult {
            old_state,
            new_state,
            outcome,
            actions: mem::take(&mut self.actions),
        }
    }

    fn dispatch(&mut self, event: Event<'_>) -> Outcome {
        // Spurious traffic after a reset must not restart anything
        if self.state == ZrtpState::Initial && event != Event::SessionStart {
            debug!("Ignoring {} while not started", event.kind());
            return Outcome::Done;
        }

        let input = match event {
            Event::SessionStart => Input::SessionStart,
            Event::PacketReceived(data) => match decode_incoming(data) {
                Some(packet) => Input::Packet(packet),
                None => return Outcome::Done,
            },
            Event::TimerFired(timer) => {
                if self.armed != Some(timer) {
                    debug!("Ignoring stale {} expiry in state {}", timer, self.state);
                    return Outcome::Done;
                }
                Input::Timer(timer)
            }
            Event::GoClearRequested => return self.on_go_clear_request(),
            Event::Close => {
                if self.state != ZrtpState::SecureState {
                    debug!("Closing stream in state {}", self.state);
                    self.reset_to_initial();
                    return Outcome::Done;
                }
                Input::Close
            }
        };

        if let Input::Packet(ZrtpPacket::Error(error)) = &input {
            return self.on_peer_error(*error);
        }

        match self.state {
            ZrtpState::Initial => self.on_initial(input),
            ZrtpState::Detect => self.on_detect(input),
            ZrtpState::AckDetected => self.on_ack_detected(input),
            ZrtpState::WaitCommit => self.on_wait_commit(input),
            ZrtpState::CommitSent => self.on_commit_sent(input),
            ZrtpState::WaitDhPart2 => self.on_wait_dh_part2(input),
            ZrtpState::WaitConfirm1 => self.on_wait_confirm1(input),
            ZrtpState::WaitConfirm2 => self.on_wait_confirm2(input),
            ZrtpState::WaitConfAck => self.on_wait_conf_ack(input),
            ZrtpState::WaitClearAck => self.on_wait_clear_ack(input),
            ZrtpState::SecureState => self.on_secure(input),
            ZrtpState::WaitErrorAck => self.on_wait_error_ack(input),
        }
    }

    pub(super) fn next_state(&mut self, state: ZrtpState) {
        self.state = state;
    }

    pub(super) fn notify(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Severe | Severity::Error => tracing::error!("{}", message),
        }
        self.context.send_info(severity, message);
        self.actions.push(Action::Notified {
            severity,
            message: message.to_string(),
        });
    }

    pub(super) fn record(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Drop the outstanding packet
    pub(super) fn release_packet(&mut self) {
        if let Some(released) = self.slot.release() {
            self.actions.push(Action::PacketReleased {
                message: released.message,
                owned: released.owned,
            });
        }
    }

    /// Install a packet as the outstanding one and send it
    pub(super) fn send_retained(&mut self, packet: OutboundPacket) -> bool {
        let message = packet.message_type();
        if let Some(released) = self.slot.install(packet) {
            self.actions.push(Action::PacketReleased {
                message: released.message,
                owned: released.owned,
            });
        }
        let sent = match self.slot.get() {
            Some(p) => self.context.send_packet(p.as_bytes()),
            None => false,
        };
        self.record_send(message, sent, true);
        sent
    }

    /// Send a packet that is not kept for retransmission
    pub(super) fn send_once(&mut self, packet: &OutboundPacket) -> bool {
        let sent = self.context.send_packet(packet.as_bytes());
        self.record_send(packet.message_type(), sent, false);
        sent
    }

    /// Send the outstanding packet again
    pub(super) fn resend_outstanding(&mut self) -> bool {
        let (message, sent) = match self.slot.get() {
            Some(p) => (p.message_type(), self.context.send_packet(p.as_bytes())),
            None => return true,
        };
        self.record_send(message, sent, true);
        sent
    }

    fn record_send(&mut self, message: MessageType, sent: bool, retained: bool) {
        if sent {
            self.actions.push(Action::Sent { message, retained });
        } else {
            warn!("Transport refused {} packet", message);
            self.actions.push(Action::SendFailed { message });
        }
    }

    fn timer_mut(&mut self, timer: TimerId) -> &mut RetransmitTimer {
        match timer {
            TimerId::T1 => &mut self.t1,
            TimerId::T2 => &mut self.t2,
        }
    }

    /// Reset and arm a retransmission timer
    pub(super) fn start_timer(&mut self, timer: TimerId) -> bool {
        let interval = self.timer_mut(timer).start();
        if !self.context.activate_timer(timer, interval) {
            self.armed = None;
            return false;
        }
        self.armed = Some(timer);
        self.actions.push(Action::TimerStarted { timer, interval });
        true
    }

    pub(super) fn cancel_timer(&mut self) {
        if let Some(timer) = self.armed.take() {
            self.context.cancel_timer();
            self.actions.push(Action::TimerCancelled { timer });
        }
    }

    /// Back off, re-arm and resend the outstanding packet
    pub(super) fn retransmit(&mut self, timer: TimerId) -> Retransmit {
        if self.slot.is_empty() {
            self.armed = None;
            return Retransmit::Resent;
        }
        match self.timer_mut(timer).reschedule() {
            Reschedule::Exhausted => {
                debug!("{} exhausted in state {}", timer, self.state);
                self.armed = None;
                self.actions.push(Action::TimerExhausted { timer });
                Retransmit::Failed
            }
            Reschedule::Next(interval) => {
                if !self.context.activate_timer(timer, interval) {
                    self.armed = None;
                    return Retransmit::Failed;
                }
                self.actions.push(Action::TimerRescheduled { timer, interval });
                if !self.resend_outstanding() {
                    self.cancel_timer();
                    return Retransmit::Failed;
                }
                Retransmit::Resent
            }
        }
    }

    pub(super) fn srtp_on(&mut self) {
        self.context.srtp_secrets_ready(SrtpDirection::ForSender);
        self.context.srtp_secrets_ready(SrtpDirection::ForReceiver);
        self.srtp_active = true;
        self.actions.push(Action::SrtpEnabled);
    }

    pub(super) fn srtp_off(&mut self) {
        self.context.srtp_secrets_off(SrtpDirection::ForSender);
        self.context.srtp_secrets_off(SrtpDirection::ForReceiver);
        self.srtp_active = false;
        self.actions.push(Action::SrtpDisabled);
    }

    /// Cancel the timer, drop the outstanding packet, switch SRTP off if it
    /// is on and enter Initial
    pub(super) fn reset_to_initial(&mut self) {
        self.cancel_timer();
        self.release_packet();
        if self.srtp_active {
            self.srtp_off();
        }
        self.role = None;
        self.next_state(ZrtpState::Initial);
    }

    /// Fatal path: reset and report
    pub(super) fn fail(&mut self, message: &str) -> Outcome {
        self.reset_to_initial();
        self.notify(Severity::Error, message);
        Outcome::Fail
    }
}

/// Frame, check and decode a received packet. Anything that fails is
/// dropped.
fn decode_incoming(data: &[u8]) -> Option<ZrtpPacket> {
    let frame = match Frame::parse(data) {
        Ok(frame) => frame,
        Err(e) => {
            debug!("Dropping unparseable packet: {}", e);
            return None;
        }
    };
    if let Err(e) = frame.verify_crc() {
        warn!("Dropping {} packet: {}", frame.message_type(), e);
        return None;
    }
    match ZrtpPacket::from_frame(&frame) {
        Ok(packet) => Some(packet),
        Err(e) => {
            warn!("Dropping malformed {} packet: {}", frame.message_type(), e);
            None
        }
    }
}
