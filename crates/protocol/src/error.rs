//! Protocol error types

use thiserror::Error;

use crate::ErrorCode;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid magic bytes")]
    InvalidMagic,

    #[error("Discarded {skipped} bytes that did not start a frame")]
    LostSync { skipped: usize },

    #[error("Version mismatch: expected {expected}, got {got}")]
    VersionMismatch { expected: u16, got: u16 },

    #[error("Unknown message type: 0x{0:04X}")]
    UnknownMessageType(u16),

    #[error("Payload CRC mismatch: expected 0x{expected:08X}, got 0x{got:08X}")]
    PayloadCrcMismatch { expected: u32, got: u32 },

    #[error("Buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },

    #[error("Invalid payload length for message type")]
    InvalidPayloadLength,

    #[error("Payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("Unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage { expected: &'static str, got: String },

    #[error("Protocol error: {code:?} - {message}")]
    ProtocolErrorResponse { code: Option<ErrorCode>, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Error code to report back to the peer
    pub fn code(&self) -> ErrorCode {
        match self {
            ProtocolError::VersionMismatch { .. } => ErrorCode::BadVersion,
            ProtocolError::PayloadCrcMismatch { .. } => ErrorCode::BadCrc,
            ProtocolError::UnknownMessageType(_) => ErrorCode::UnknownMsgType,
            ProtocolError::UnexpectedMessage { .. } => ErrorCode::UnexpectedMessage,
            ProtocolError::Io(_) | ProtocolError::ProtocolErrorResponse { .. } => ErrorCode::Internal,
            _ => ErrorCode::MalformedFrame,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
