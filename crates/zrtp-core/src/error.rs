//! Error types for the ZRTP core
//!
//! Protocol outcomes of the handshake (peer sent garbage, retry limit hit,
//! transport refused a packet) are not reported through these types; the
//! state machine reports them as [`Outcome`](crate::state_machine::Outcome)
//! values. The errors here cover decoding, configuration and the session
//! wrapper.

use thiserror::Error;

use crate::packet::MessageType;

/// Result type for ZRTP core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while decoding a ZRTP packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Buffer too small: need {required} bytes but only {available} available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("Bad preamble: 0x{0:04x}")]
    BadPreamble(u16),

    #[error("Unknown message type: {0:?}")]
    UnknownMessageType([u8; 8]),

    #[error("Declared length of {declared} words does not match {expected} words")]
    LengthMismatch { declared: usize, expected: usize },

    #[error("{category} list with {count} entries extends past the buffer")]
    CountExceedsBuffer { category: &'static str, count: usize },

    #[error("CRC mismatch: expected 0x{expected:08x}, computed 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

/// Errors raised while encoding a ZRTP packet
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("Too many {category} algorithms in Hello: {count} (at most 15)")]
    TooManyAlgorithms { category: &'static str, count: usize },

    #[error("{message_type} body of {body_len} bytes exceeds the {max} byte limit")]
    BodyTooLarge {
        message_type: MessageType,
        body_len: usize,
        max: usize,
    },
}

/// Errors raised while building or loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Too many {category} algorithms: {count} (at most 15)")]
    TooManyAlgorithms { category: &'static str, count: usize },

    #[error("No {0} algorithm configured")]
    EmptyCategory(&'static str),

    #[error("Client id is {0} bytes long (at most 16)")]
    ClientIdTooLong(usize),

    #[error("Invalid algorithm identifier: {0:?}")]
    InvalidAlgorithm(String),

    #[error("Invalid timer configuration: {0}")]
    InvalidTimer(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the multi-stream session wrapper
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Stream not configured: {0}")]
    StreamNotConfigured(String),

    #[error("Stream stopped: {0}")]
    StreamStopped(String),

    #[error("Session not initialized")]
    NotInitialized,

    #[error("Context creation failed: {0}")]
    ContextCreation(String),
}

/// Top-level error for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}
