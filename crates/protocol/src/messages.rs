//! Message payload types

mod classify;
mod error_msg;

pub use classify::{ClassifyRequestPayload, ClassifyResponsePayload, MAX_PIXELS};
pub use error_msg::ErrorPayload;

use crate::constants::MsgType;
use crate::error::Result;
use crate::frame::Frame;

/// Trait for message payloads that can be encoded/decoded
pub trait Payload: Sized {
    /// The message type for this payload
    const MSG_TYPE: MsgType;

    /// Encode the payload to bytes
    fn encode(&self) -> Vec<u8>;

    /// Decode the payload from bytes
    fn decode(data: &[u8]) -> Result<Self>;

    /// Create a frame from this payload and a sequence number
    fn into_frame(self, seq: u32) -> Frame {
        Frame::new(Self::MSG_TYPE, seq, self.encode())
    }
}

/// A parsed message with its sequence number and typed payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    ClassifyRequest {
        seq: u32,
        payload: ClassifyRequestPayload,
    },
    ClassifyResponse {
        seq: u32,
        payload: ClassifyResponsePayload,
    },
    Error {
        seq: u32,
        payload: ErrorPayload,
    },
}

impl Message {
    /// Parse a frame into a typed message
    pub fn from_frame(frame: Frame) -> Result<Self> {
        match frame.msg_type {
            MsgType::ClassifyRequest => Ok(Message::ClassifyRequest {
                seq: frame.seq,
                payload: ClassifyRequestPayload::decode(&frame.payload)?,
            }),
            MsgType::ClassifyResponse => Ok(Message::ClassifyResponse {
                seq: frame.seq,
                payload: ClassifyResponsePayload::decode(&frame.payload)?,
            }),
            MsgType::Error => Ok(Message::Error {
                seq: frame.seq,
                payload: ErrorPayload::decode(&frame.payload)?,
            }),
        }
    }

    /// Encode this message into a frame
    pub fn into_frame(self) -> Frame {
        match self {
            Message::ClassifyRequest { seq, payload } => payload.into_frame(seq),
            Message::ClassifyResponse { seq, payload } => payload.into_frame(seq),
            Message::Error { seq, payload } => payload.into_frame(seq),
        }
    }

    /// Sequence number carried by this message
    pub fn seq(&self) -> u32 {
        match self {
            Message::ClassifyRequest { seq, .. }
            | Message::ClassifyResponse { seq, .. }
            | Message::Error { seq, .. } => *seq,
        }
    }

    /// Short name for logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Message::ClassifyRequest { .. } => "ClassifyRequest",
            Message::ClassifyResponse { .. } => "ClassifyResponse",
            Message::Error { .. } => "Error",
        }
    }

    /// Encode this message into bytes
    pub fn encode(&self) -> Vec<u8> {
        self.clone().into_frame().encode()
    }

    /// Decode a message from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        let frame = Frame::decode(data)?;
        Self::from_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;

    #[test]
    fn test_message_roundtrip() {
        let messages = vec![
            Message::ClassifyRequest {
                seq: 1,
                payload: ClassifyRequestPayload::new(vec![0, 128, 255]).unwrap(),
            },
            Message::ClassifyResponse {
                seq: 1,
                payload: ClassifyResponsePayload::new(7, 10, vec![-5, 0, 1 << 20]),
            },
            Message::Error {
                seq: 2,
                payload: ErrorPayload::new(ErrorCode::BadCrc, "checksum failed"),
            },
        ];

        for message in messages {
            let decoded = Message::decode(&message.encode()).unwrap();
            assert_eq!(decoded.seq(), message.seq());
            assert_eq!(decoded, message);
        }
    }
}
