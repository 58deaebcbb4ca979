//! ERROR message payload

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Write};

use crate::constants::{ErrorCode, MsgType};
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;

/// ERROR payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPayload {
    /// Error code
    pub err_code: u32,
    /// Human-readable error message
    pub message: String,
}

impl ErrorPayload {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            err_code: code.to_u32(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_u32(self.err_code)
    }

    /// Turn a received error into a local error value
    pub fn into_error(self) -> ProtocolError {
        ProtocolError::ProtocolErrorResponse {
            code: self.error_code(),
            message: self.message,
        }
    }
}

impl Payload for ErrorPayload {
    const MSG_TYPE: MsgType = MsgType::Error;

    fn encode(&self) -> Vec<u8> {
        let msg_bytes = self.message.as_bytes();
        let msg_len = msg_bytes.len().min(u16::MAX as usize);
        let mut buf = Vec::with_capacity(8 + msg_len);

        buf.write_u32::<LittleEndian>(self.err_code)
            .expect("Vec write should not fail");
        buf.write_u16::<LittleEndian>(msg_len as u16)
            .expect("Vec write should not fail");
        buf.write_u16::<LittleEndian>(0)
            .expect("Vec write should not fail"); // reserved
        buf.write_all(&msg_bytes[..msg_len])
            .expect("Vec write should not fail");

        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut cursor = Cursor::new(data);

        let err_code = cursor.read_u32::<LittleEndian>()?;
        let message_len = cursor.read_u16::<LittleEndian>()? as usize;
        let _reserved = cursor.read_u16::<LittleEndian>()?;

        if data.len() < 8 + message_len {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut msg_bytes = vec![0u8; message_len];
        cursor.read_exact(&mut msg_bytes)?;

        let message = String::from_utf8_lossy(&msg_bytes).into_owned();

        Ok(Self { err_code, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_roundtrip() {
        let payload = ErrorPayload::new(ErrorCode::DimensionMismatch, "expected 196 pixels, got 3");
        let decoded = ErrorPayload::decode(&payload.encode()).unwrap();
        assert_eq!(payload, decoded);
        assert_eq!(decoded.error_code(), Some(ErrorCode::DimensionMismatch));
    }

    #[test]
    fn test_error_truncated_message() {
        let mut encoded = ErrorPayload::new(ErrorCode::Internal, "boom").encode();
        encoded.truncate(10);
        assert!(matches!(
            ErrorPayload::decode(&encoded),
            Err(ProtocolError::InvalidPayloadLength)
        ));
    }

    #[test]
    fn test_into_error() {
        let err = ErrorPayload::new(ErrorCode::BadVersion, "v9").into_error();
        assert!(matches!(
            err,
            ProtocolError::ProtocolErrorResponse { code: Some(ErrorCode::BadVersion), .. }
        ));
    }
}
