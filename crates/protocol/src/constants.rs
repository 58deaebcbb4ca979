//! Protocol constants

/// Protocol magic bytes: "DGNT"
pub const MAGIC: [u8; 4] = [0x44, 0x47, 0x4E, 0x54];

/// Protocol version (v1)
pub const PROTOCOL_VERSION: u16 = 0x0001;

/// Largest payload a frame may carry
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Message type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MsgType {
    /// Image to classify (Host → Device)
    ClassifyRequest = 0x0001,
    /// Predicted class and logits (Device → Host)
    ClassifyResponse = 0x0002,
    /// Error message (Device → Host)
    Error = 0x00F0,
}

impl MsgType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(MsgType::ClassifyRequest),
            0x0002 => Some(MsgType::ClassifyResponse),
            0x00F0 => Some(MsgType::Error),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    BadVersion = 0x00000001,
    BadCrc = 0x00000002,
    UnknownMsgType = 0x00000003,
    MalformedFrame = 0x00000004,
    DimensionMismatch = 0x00000005,
    UnexpectedMessage = 0x00000006,
    Internal = 0x0000000A,
}

impl ErrorCode {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x00000001 => Some(ErrorCode::BadVersion),
            0x00000002 => Some(ErrorCode::BadCrc),
            0x00000003 => Some(ErrorCode::UnknownMsgType),
            0x00000004 => Some(ErrorCode::MalformedFrame),
            0x00000005 => Some(ErrorCode::DimensionMismatch),
            0x00000006 => Some(ErrorCode::UnexpectedMessage),
            0x0000000A => Some(ErrorCode::Internal),
            _ => None,
        }
    }

    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_type_codes() {
        for t in [MsgType::ClassifyRequest, MsgType::ClassifyResponse, MsgType::Error] {
            assert_eq!(MsgType::from_u16(t.to_u16()), Some(t));
        }
        assert_eq!(MsgType::from_u16(0x1234), None);
    }

    #[test]
    fn test_error_code_codes() {
        assert_eq!(ErrorCode::from_u32(5), Some(ErrorCode::DimensionMismatch));
        assert_eq!(ErrorCode::from_u32(0xFF), None);
    }
}
