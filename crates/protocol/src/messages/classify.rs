//! CLASSIFY_REQUEST and CLASSIFY_RESPONSE payloads

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::constants::{MsgType, MAX_PAYLOAD_LEN};
use crate::error::{ProtocolError, Result};
use crate::messages::Payload;

/// Most pixels one request can carry within the payload limit
pub const MAX_PIXELS: usize = MAX_PAYLOAD_LEN - 4;

/// CLASSIFY_REQUEST payload: one flattened 8-bit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyRequestPayload {
    pixels: Vec<u8>,
}

impl ClassifyRequestPayload {
    pub fn new(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() > MAX_PIXELS {
            return Err(ProtocolError::PayloadTooLarge {
                len: pixels.len(),
                max: MAX_PIXELS,
            });
        }
        Ok(Self { pixels })
    }

    /// Pixel bytes, each `p / 256`
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

impl Payload for ClassifyRequestPayload {
    const MSG_TYPE: MsgType = MsgType::ClassifyRequest;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.pixels.len());

        buf.write_u16::<LittleEndian>(self.pixels.len() as u16)
            .expect("Vec write should not fail");
        buf.write_u16::<LittleEndian>(0)
            .expect("Vec write should not fail"); // reserved
        buf.extend_from_slice(&self.pixels);

        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut cursor = Cursor::new(data);
        let pixel_count = cursor.read_u16::<LittleEndian>()? as usize;
        let _reserved = cursor.read_u16::<LittleEndian>()?;

        if data.len() != 4 + pixel_count || pixel_count > MAX_PIXELS {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut pixels = vec![0u8; pixel_count];
        cursor.read_exact(&mut pixels)?;

        Ok(Self { pixels })
    }
}

/// CLASSIFY_RESPONSE payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifyResponsePayload {
    /// Index of the largest logit
    pub class: u8,
    /// Fractional bits of the logits
    pub logit_bits: i8,
    /// Raw fixed-point logits
    pub logits: Vec<i32>,
}

impl ClassifyResponsePayload {
    pub fn new(class: u8, logit_bits: i8, logits: Vec<i32>) -> Self {
        Self {
            class,
            logit_bits,
            logits,
        }
    }
}

impl Payload for ClassifyResponsePayload {
    const MSG_TYPE: MsgType = MsgType::ClassifyResponse;

    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.logits.len() * 4);

        buf.write_u8(self.class).expect("Vec write should not fail");
        buf.write_i8(self.logit_bits)
            .expect("Vec write should not fail");
        buf.write_u16::<LittleEndian>(self.logits.len() as u16)
            .expect("Vec write should not fail");
        for &logit in &self.logits {
            buf.write_i32::<LittleEndian>(logit)
                .expect("Vec write should not fail");
        }

        buf
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 4 {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut cursor = Cursor::new(data);
        let class = cursor.read_u8()?;
        let logit_bits = cursor.read_i8()?;
        let count = cursor.read_u16::<LittleEndian>()? as usize;

        if data.len() != 4 + count * 4 {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        let mut logits = Vec::with_capacity(count);
        for _ in 0..count {
            logits.push(cursor.read_i32::<LittleEndian>()?);
        }

        if count > 0 && class as usize >= count {
            return Err(ProtocolError::InvalidPayloadLength);
        }

        Ok(Self {
            class,
            logit_bits,
            logits,
        })
    }
}
