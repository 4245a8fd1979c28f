//! Per-state event handlers
//!
//! Each handler sees a decoded [`Input`] and decides the next state, the
//! packet to send and the timer to arm. Packets that make no sense in a
//! state are ignored.

use tracing::{debug, info, warn};

use super::context::{NegotiationContext, Severity};
use super::executor::{Input, Retransmit, ZrtpStateMachine};
use super::resolver;
use super::slot::OutboundPacket;
use super::types::{Action, Outcome, Role, ZrtpState};
use crate::packet::{Commit, ErrorCode, ErrorPacket, ZrtpPacket};
use crate::timer::TimerId;

pub const SEND_ERROR: &str = "Failed to send ZRTP packet";
pub const SEND_ERROR_SRTP: &str = "Failed to send ZRTP packet, secure media not available";
pub const TIMER_ERROR: &str = "Failed to start retransmission timer";
pub const RESEND_ERROR: &str = "Retransmission limit reached, no response from peer";
pub const INTERNAL_PROTOCOL_ERROR: &str = "Internal protocol error";
pub const SECURE_STATE_REACHED: &str = "Switching to secure state";
pub const SECURITY_CLOSED: &str = "No more security for this session";
pub const GO_CLEAR_RECEIVED: &str = "Peer requested to go clear";

impl<C: NegotiationContext> ZrtpStateMachine<C> {
    pub(super) fn on_initial(&mut self, input: Input) -> Outcome {
        if let Input::SessionStart = input {
            let hello = self.context.prepare_hello();
            if !self.send_retained(hello.into()) || !self.start_timer(TimerId::T1) {
                return self.fail(SEND_ERROR);
            }
            self.next_state(ZrtpState::Detect);
        }
        Outcome::Done
    }

    /// Hello is outstanding, T1 is running. We assume Initiator until the
    /// peer tells us otherwise.
    pub(super) fn on_detect(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Commit(commit)) => {
                self.cancel_timer();
                self.release_packet();
                self.respond_to_commit(&commit)
            }
            Input::Packet(ZrtpPacket::HelloAck) => {
                self.cancel_timer();
                self.release_packet();
                self.next_state(ZrtpState::AckDetected);
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::Hello(hello)) => {
                self.cancel_timer();
                // Peer may have missed ours
                self.resend_outstanding();
                self.release_packet();

                let commit = match self.context.prepare_commit(&hello) {
                    Ok(commit) => commit,
                    Err(code) => return self.send_error_packet(code),
                };
                self.role = Some(Role::Initiator);
                self.next_state(ZrtpState::CommitSent);
                if !self.send_retained(commit.into()) || !self.start_timer(TimerId::T2) {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => match self.retransmit(timer) {
                Retransmit::Resent => Outcome::Done,
                Retransmit::Failed => {
                    // Keep listening in Detect; a late Hello can still start
                    // the handshake.
                    self.release_packet();
                    self.context.not_supported_by_peer();
                    self.record(Action::Notified {
                        severity: Severity::Warning,
                        message: super::context::NOT_ZRTP_CAPABLE.to_string(),
                    });
                    warn!("No answer to Hello, peer is not ZRTP capable");
                    Outcome::Fail
                }
            },
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// Our Hello was acknowledged; nothing outstanding.
    pub(super) fn on_ack_detected(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Hello(_)) => {
                let ack = self.context.prepare_hello_ack();
                self.next_state(ZrtpState::WaitCommit);
                if !self.send_retained(ack) {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::Commit(commit)) => self.respond_to_commit(&commit),
            Input::Packet(other) => self.ignore(&other),
            _ => self.protocol_error(),
        }
    }

    /// HelloACK is outstanding, no timer; we will be Responder.
    pub(super) fn on_wait_commit(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Hello(_)) => {
                if !self.resend_outstanding() {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::Commit(commit)) => {
                self.release_packet();
                self.respond_to_commit(&commit)
            }
            Input::Packet(other) => self.ignore(&other),
            _ => self.protocol_error(),
        }
    }

    /// Commit is outstanding, T2 is running.
    pub(super) fn on_commit_sent(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::HelloAck) => {
                debug!("Late HelloACK in CommitSent");
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::Commit(commit)) => {
                self.cancel_timer();
                let ordering = self.context.compare_hvi(&commit);
                let role = resolver::resolve(ordering);
                info!("Commit contention resolved ({:?}): local side is {:?}", ordering, role);

                match role {
                    Role::Responder => {
                        self.release_packet();
                        self.respond_to_commit(&commit)
                    }
                    Role::Initiator => {
                        self.role = Some(Role::Initiator);
                        if !self.start_timer(TimerId::T2) {
                            return self.fail(TIMER_ERROR);
                        }
                        Outcome::Done
                    }
                }
            }
            Input::Packet(ZrtpPacket::DhPart1(dh_part1)) => {
                self.cancel_timer();
                self.release_packet();

                let dh_part2 = match self.context.prepare_dh_part2(&dh_part1) {
                    Ok(packet) => packet,
                    Err(code) => return self.send_error_packet(code),
                };
                self.next_state(ZrtpState::WaitConfirm1);
                if !self.send_retained(dh_part2.into()) || !self.start_timer(TimerId::T2) {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => self.retransmit_or_fail(timer),
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// DHPart1 is outstanding, no timer; Responder.
    pub(super) fn on_wait_dh_part2(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Commit(_)) => {
                if !self.resend_outstanding() {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::DhPart2(dh_part2)) => {
                self.release_packet();
                let confirm1 = match self.context.prepare_confirm1(&dh_part2) {
                    Ok(packet) => packet,
                    Err(code) => return self.send_error_packet(code),
                };
                self.next_state(ZrtpState::WaitConfirm2);
                if !self.send_retained(confirm1.into()) {
                    return self.fail(SEND_ERROR_SRTP);
                }
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            _ => self.protocol_error(),
        }
    }

    /// DHPart2 is outstanding, T2 is running; Initiator.
    pub(super) fn on_wait_confirm1(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Confirm1(confirm1)) => {
                self.cancel_timer();
                self.release_packet();
                let confirm2 = match self.context.prepare_confirm2(&confirm1) {
                    Ok(packet) => packet,
                    Err(code) => return self.send_error_packet(code),
                };
                self.next_state(ZrtpState::WaitConfAck);
                if !self.send_retained(confirm2.into()) || !self.start_timer(TimerId::T2) {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => self.retransmit_or_fail(timer),
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// Confirm1 is outstanding, no timer; Responder.
    pub(super) fn on_wait_confirm2(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::DhPart2(_)) => {
                if !self.resend_outstanding() {
                    return self.fail(SEND_ERROR);
                }
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::Confirm2(confirm2)) => {
                self.release_packet();
                let ack = match self.context.prepare_conf2_ack(&confirm2) {
                    Ok(packet) => packet,
                    Err(code) => return self.send_error_packet(code),
                };
                self.next_state(ZrtpState::SecureState);
                if !self.send_retained(ack) {
                    return self.fail(SEND_ERROR_SRTP);
                }
                self.notify(Severity::Info, SECURE_STATE_REACHED);
                self.srtp_on();
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            _ => self.protocol_error(),
        }
    }

    /// Confirm2 is outstanding, T2 is running; Initiator.
    pub(super) fn on_wait_conf_ack(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Conf2Ack) => {
                self.cancel_timer();
                self.release_packet();
                self.next_state(ZrtpState::SecureState);
                self.notify(Severity::Info, SECURE_STATE_REACHED);
                self.srtp_on();
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => match self.retransmit(timer) {
                Retransmit::Resent => Outcome::Done,
                Retransmit::Failed => {
                    self.srtp_off();
                    self.fail(RESEND_ERROR)
                }
            },
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// GoClear is outstanding, T2 is running.
    pub(super) fn on_wait_clear_ack(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::ClearAck) => {
                self.reset_to_initial();
                self.notify(Severity::Info, SECURITY_CLOSED);
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => self.retransmit_or_fail(timer),
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// Error is outstanding, T2 is running.
    pub(super) fn on_wait_error_ack(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::ErrorAck) => {
                self.reset_to_initial();
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(timer) => self.retransmit_or_fail(timer),
            Input::SessionStart | Input::Close => self.protocol_error(),
        }
    }

    /// Keys are in use. Conf2ACK is outstanding on the Responder side.
    pub(super) fn on_secure(&mut self, input: Input) -> Outcome {
        match input {
            Input::Packet(ZrtpPacket::Confirm2(_)) => {
                if !self.resend_outstanding() {
                    return self.fail(SEND_ERROR_SRTP);
                }
                Outcome::Done
            }
            Input::Packet(ZrtpPacket::GoClear(go_clear)) => {
                self.notify(Severity::Warning, GO_CLEAR_RECEIVED);
                let ack = self.context.prepare_clear_ack(&go_clear);
                self.send_once(&ack);
                Outcome::Done
            }
            Input::Packet(other) => self.ignore(&other),
            Input::Timer(_) => Outcome::Done,
            Input::SessionStart | Input::Close => {
                self.reset_to_initial();
                self.notify(Severity::Info, SECURITY_CLOSED);
                Outcome::Done
            }
        }
    }

    /// Local request to leave secure mode
    pub(super) fn on_go_clear_request(&mut self) -> Outcome {
        if self.state != ZrtpState::SecureState {
            warn!("GoClear requested in state {}, ignoring", self.state);
            return Outcome::Done;
        }
        let go_clear = self.context.prepare_go_clear();
        self.next_state(ZrtpState::WaitClearAck);
        if !self.send_retained(go_clear.into()) || !self.start_timer(TimerId::T2) {
            return self.fail(SEND_ERROR);
        }
        Outcome::Done
    }

    /// The peer gave up on the handshake
    pub(super) fn on_peer_error(&mut self, error: ErrorPacket) -> Outcome {
        self.record(Action::PeerError(error.code));
        let ack = self.context.prepare_error_ack(&error);
        self.send_once(&ack);
        self.reset_to_initial();
        self.notify(Severity::Error, &format!("Peer reported ZRTP error {}", error.code));
        Outcome::Fail
    }

    /// Build and send DHPart1 for the peer's Commit, taking the Responder role
    fn respond_to_commit(&mut self, commit: &Commit) -> Outcome {
        self.role = Some(Role::Responder);
        let dh_part1 = match self.context.prepare_dh_part1(commit) {
            Ok(packet) => packet,
            Err(code) => return self.send_error_packet(code),
        };
        self.next_state(ZrtpState::WaitDhPart2);
        if !self.send_retained(dh_part1.into()) {
            return self.fail(SEND_ERROR);
        }
        Outcome::Done
    }

    fn retransmit_or_fail(&mut self, timer: TimerId) -> Outcome {
        match self.retransmit(timer) {
            Retransmit::Resent => Outcome::Done,
            Retransmit::Failed => self.fail(RESEND_ERROR),
        }
    }

    /// Answer a failed preparation step with an Error packet
    pub(super) fn send_error_packet(&mut self, code: ErrorCode) -> Outcome {
        warn!("Negotiation failed in state {}: {}", self.state, code);
        self.cancel_timer();
        let error = match self.context.prepare_error(code) {
            Ok(error) => error,
            Err(err) => {
                warn!("Failed to build Error packet: {}", err);
                return self.fail(SEND_ERROR);
            }
        };
        if !self.send_retained(OutboundPacket::Owned(error)) || !self.start_timer(TimerId::T2) {
            return self.fail(SEND_ERROR);
        }
        self.next_state(ZrtpState::WaitErrorAck);
        Outcome::Done
    }

    fn protocol_error(&mut self) -> Outcome {
        self.fail(INTERNAL_PROTOCOL_ERROR)
    }

    fn ignore(&self, packet: &ZrtpPacket) -> Outcome {
        debug!("Ignoring {} in state {}", packet.message_type(), self.state);
        Outcome::Done
    }
}
