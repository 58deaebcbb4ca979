//! Harness error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Model error: {0}")]
    Model(#[from] digitnet_model::ModelError),

    #[error("Engine error: {0}")]
    Engine(#[from] digitnet_engine::EngineError),

    #[error("Fixed-point error: {0}")]
    FixedPoint(#[from] digitnet_fixed_point::FixedPointError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] digitnet_protocol::ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Verification failed: {message}")]
    VerificationFailed { message: String },

    #[error("Reply sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: u32, got: u32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
