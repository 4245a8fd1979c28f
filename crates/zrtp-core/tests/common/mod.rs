#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use rvoip_zrtp_core::packet::commit::HVI_LEN;
use rvoip_zrtp_core::packet::confirm::CFB_IV_LEN;
use rvoip_zrtp_core::packet::dh_part::SECRET_ID_LEN;
use rvoip_zrtp_core::packet::{
    self, Commit, Confirm, DhPart, EncodedPacket, ErrorCode, ErrorPacket, Frame, GoClear, Hello,
    MessageType, ZrtpPacket, MAC_LEN, ZID_LEN,
};
use rvoip_zrtp_core::{
    AlgorithmId, EncodeError, NegotiationContext, OutboundPacket, Severity, SrtpDirection, TimerId, ZrtpConfig,
};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Deterministic 32-byte value derived from a label
pub fn digest(label: &str) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(label.as_bytes()));
    out
}

pub fn hvi_with_prefix(prefix: u8, label: &str) -> [u8; HVI_LEN] {
    let mut hvi = digest(label);
    hvi[0] = prefix;
    hvi
}

fn zid(label: &str) -> [u8; ZID_LEN] {
    let mut out = [0u8; ZID_LEN];
    out.copy_from_slice(&digest(label)[..ZID_LEN]);
    out
}

pub fn hello(label: &str) -> EncodedPacket {
    let hello = Hello::from_config(&ZrtpConfig::default(), zid(label), digest(label));
    ZrtpPacket::Hello(hello).encode().unwrap()
}

pub fn commit(label: &str, hvi: [u8; HVI_LEN]) -> EncodedPacket {
    ZrtpPacket::Commit(Commit {
        h2: digest(&format!("{}-h2", label)),
        zid: zid(label),
        hash: AlgorithmId::new(b"S256"),
        cipher: AlgorithmId::new(b"AES1"),
        auth_length: AlgorithmId::new(b"HS32"),
        pub_key: AlgorithmId::new(b"EC25"),
        sas: AlgorithmId::new(b"B32 "),
        hvi,
        mac: [0x11; MAC_LEN],
    })
    .encode()
    .unwrap()
}

fn dh_part(label: &str) -> DhPart {
    let mut pv = digest(&format!("{}-pv-x", label)).to_vec();
    pv.extend_from_slice(&digest(&format!("{}-pv-y", label)));
    DhPart {
        h1: digest(&format!("{}-h1", label)),
        rs1_id: [1; SECRET_ID_LEN],
        rs2_id: [2; SECRET_ID_LEN],
        aux_secret_id: [3; SECRET_ID_LEN],
        pbx_secret_id: [4; SECRET_ID_LEN],
        pv: Bytes::from(pv),
        mac: [0x22; MAC_LEN],
    }
}

pub fn dh_part1(label: &str) -> EncodedPacket {
    ZrtpPacket::DhPart1(dh_part(label)).encode().unwrap()
}

pub fn dh_part2(label: &str) -> EncodedPacket {
    ZrtpPacket::DhPart2(dh_part(label)).encode().unwrap()
}

fn confirm(label: &str) -> Confirm {
    Confirm {
        confirm_mac: [0x33; MAC_LEN],
        iv: [0x44; CFB_IV_LEN],
        encrypted: Bytes::from(digest(&format!("{}-h0", label)).to_vec()),
    }
}

pub fn confirm1(label: &str) -> EncodedPacket {
    ZrtpPacket::Confirm1(confirm(label)).encode().unwrap()
}

pub fn confirm2(label: &str) -> EncodedPacket {
    ZrtpPacket::Confirm2(confirm(label)).encode().unwrap()
}

pub fn go_clear() -> EncodedPacket {
    ZrtpPacket::GoClear(GoClear { clear_mac: [0x55; MAC_LEN] }).encode().unwrap()
}

pub fn error(code: ErrorCode) -> EncodedPacket {
    ZrtpPacket::Error(ErrorPacket { code }).encode().unwrap()
}

/// A well-framed packet with a tag no ZRTP version defines
pub fn unknown_tag() -> Vec<u8> {
    let mut data = packet::hello_ack().as_bytes().to_vec();
    data[4..12].copy_from_slice(b"SASrelay");
    let sum = packet::crc::checksum(&data[..12]);
    data[12..16].copy_from_slice(&sum.to_be_bytes());
    data
}

pub fn message_type_of(data: &[u8]) -> MessageType {
    Frame::parse(data).expect("sent packet must be well formed").message_type()
}

/// Scripted negotiation context recording everything the machine does
pub struct MockContext {
    pub label: String,
    pub own_hvi: [u8; HVI_LEN],
    pub sent: Vec<Vec<u8>>,
    pub send_ok: bool,
    pub timer_ok: bool,
    /// Preparing a packet of this type fails with the given code
    pub fail_prepare: HashMap<MessageType, ErrorCode>,
    /// Building our own Error packet fails
    pub error_unencodable: bool,
    pub timers: Vec<(TimerId, Duration)>,
    pub cancels: usize,
    pub infos: Vec<(Severity, String)>,
    pub not_supported: usize,
    pub srtp_ready: Vec<SrtpDirection>,
    pub srtp_off: Vec<SrtpDirection>,
    pub own_params: Option<Bytes>,
    pub received_params: Option<Bytes>,
}

impl MockContext {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            own_hvi: digest(&format!("{}-hvi", label)),
            sent: Vec::new(),
            send_ok: true,
            timer_ok: true,
            fail_prepare: HashMap::new(),
            error_unencodable: false,
            timers: Vec::new(),
            cancels: 0,
            infos: Vec::new(),
            not_supported: 0,
            srtp_ready: Vec::new(),
            srtp_off: Vec::new(),
            own_params: Some(Bytes::from(format!("{}-multistream", label))),
            received_params: None,
        }
    }

    pub fn with_hvi(label: &str, hvi: [u8; HVI_LEN]) -> Self {
        let mut context = Self::new(label);
        context.own_hvi = hvi;
        context
    }

    pub fn sent_types(&self) -> Vec<MessageType> {
        self.sent.iter().map(|p| message_type_of(p)).collect()
    }

    pub fn last_sent(&self) -> Option<MessageType> {
        self.sent.last().map(|p| message_type_of(p))
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    pub fn count_sent(&self, message: MessageType) -> usize {
        self.sent_types().iter().filter(|t| **t == message).count()
    }

    fn check(&self, message: MessageType) -> Result<(), ErrorCode> {
        match self.fail_prepare.get(&message) {
            Some(code) => Err(*code),
            None => Ok(()),
        }
    }
}

impl NegotiationContext for MockContext {
    fn prepare_hello(&mut self) -> EncodedPacket {
        hello(&self.label)
    }

    fn prepare_commit(&mut self, peer_hello: &Hello) -> Result<EncodedPacket, ErrorCode> {
        self.check(MessageType::Commit)?;
        if !peer_hello.supports(rvoip_zrtp_core::AlgorithmCategory::PubKey, &AlgorithmId::new(b"EC25")) {
            return Err(ErrorCode::UnsupportedPubKey);
        }
        Ok(commit(&self.label, self.own_hvi))
    }

    fn prepare_dh_part1(&mut self, _peer_commit: &Commit) -> Result<EncodedPacket, ErrorCode> {
        self.check(MessageType::DhPart1)?;
        Ok(dh_part1(&self.label))
    }

    fn prepare_dh_part2(&mut self, _peer_dh_part1: &DhPart) -> Result<EncodedPacket, ErrorCode> {
        self.check(MessageType::DhPart2)?;
        Ok(dh_part2(&self.label))
    }

    fn prepare_confirm1(&mut self, _peer_dh_part2: &DhPart) -> Result<EncodedPacket, ErrorCode> {
        self.check(MessageType::Confirm1)?;
        Ok(confirm1(&self.label))
    }

    fn prepare_confirm2(&mut self, _peer_confirm1: &Confirm) -> Result<EncodedPacket, ErrorCode> {
        self.check(MessageType::Confirm2)?;
        Ok(confirm2(&self.label))
    }

    fn prepare_conf2_ack(&mut self, _peer_confirm2: &Confirm) -> Result<OutboundPacket, ErrorCode> {
        self.check(MessageType::Conf2Ack)?;
        Ok(OutboundPacket::Static(packet::conf2_ack()))
    }

    fn prepare_go_clear(&mut self) -> EncodedPacket {
        go_clear()
    }

    fn prepare_error(&mut self, code: ErrorCode) -> Result<EncodedPacket, EncodeError> {
        if self.error_unencodable {
            return Err(EncodeError::BodyTooLarge {
                message_type: MessageType::Error,
                body_len: usize::MAX,
                max: packet::MAX_BODY_LEN,
            });
        }
        ZrtpPacket::Error(ErrorPacket { code }).encode()
    }

    fn compare_hvi(&self, peer_commit: &Commit) -> Ordering {
        rvoip_zrtp_core::state_machine::resolver::compare_hvi(&self.own_hvi, &peer_commit.hvi)
    }

    fn send_packet(&mut self, packet: &[u8]) -> bool {
        if self.send_ok {
            self.sent.push(packet.to_vec());
        }
        self.send_ok
    }

    fn activate_timer(&mut self, timer: TimerId, interval: Duration) -> bool {
        if self.timer_ok {
            self.timers.push((timer, interval));
        }
        self.timer_ok
    }

    fn cancel_timer(&mut self) -> bool {
        self.cancels += 1;
        true
    }

    fn srtp_secrets_ready(&mut self, direction: SrtpDirection) {
        self.srtp_ready.push(direction);
    }

    fn srtp_secrets_off(&mut self, direction: SrtpDirection) {
        self.srtp_off.push(direction);
    }

    fn send_info(&mut self, severity: Severity, message: &str) {
        self.infos.push((severity, message.to_string()));
    }

    fn not_supported_by_peer(&mut self) {
        self.not_supported += 1;
    }

    fn multi_stream_params(&self) -> Option<Bytes> {
        self.own_params.clone()
    }

    fn set_multi_stream_params(&mut self, params: Bytes) {
        self.received_params = Some(params);
    }
}
