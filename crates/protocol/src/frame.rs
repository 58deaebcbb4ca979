//! Frame encoding/decoding

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

use crate::constants::{MsgType, MAGIC, MAX_PAYLOAD_LEN, PROTOCOL_VERSION};
use crate::error::{ProtocolError, Result};

/// Frame preamble size (before payload):
/// magic(4) + version(2) + msg_type(2) + seq(4) + payload_len(4) + payload_crc(4) = 20
pub const PREAMBLE_SIZE: usize = 20;

/// A complete wire frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type
    pub msg_type: MsgType,
    /// Sequence number, echoed by the device in its reply
    pub seq: u32,
    /// Payload bytes (can be empty)
    pub payload: Vec<u8>,
}

/// Preamble fields once the magic has been checked
struct Preamble {
    version: u16,
    msg_type: u16,
    seq: u32,
    payload_len: usize,
    payload_crc: u32,
}

impl Preamble {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        let preamble = Self {
            version: cursor.read_u16::<LittleEndian>()?,
            msg_type: cursor.read_u16::<LittleEndian>()?,
            seq: cursor.read_u32::<LittleEndian>()?,
            payload_len: cursor.read_u32::<LittleEndian>()? as usize,
            payload_crc: cursor.read_u32::<LittleEndian>()?,
        };
        if preamble.payload_len > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLarge {
                len: preamble.payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(preamble)
    }

    /// Validate version, type and CRC against the received payload
    fn into_frame(self, payload: Vec<u8>) -> Result<Frame> {
        if self.version != PROTOCOL_VERSION {
            return Err(ProtocolError::VersionMismatch {
                expected: PROTOCOL_VERSION,
                got: self.version,
            });
        }

        let msg_type =
            MsgType::from_u16(self.msg_type).ok_or(ProtocolError::UnknownMessageType(self.msg_type))?;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != self.payload_crc {
            return Err(ProtocolError::PayloadCrcMismatch {
                expected: self.payload_crc,
                got: actual_crc,
            });
        }

        Ok(Frame {
            msg_type,
            seq: self.seq,
            payload,
        })
    }
}

impl Frame {
    /// Create a new frame with the given message type, sequence number, and payload
    pub fn new(msg_type: MsgType, seq: u32, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            seq,
            payload,
        }
    }

    /// Encode the frame to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        self.write_to(&mut buf).expect("Vec write should not fail");
        buf
    }

    /// Write the frame to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        writer.write_u16::<LittleEndian>(PROTOCOL_VERSION)?;
        writer.write_u16::<LittleEndian>(self.msg_type.to_u16())?;
        writer.write_u32::<LittleEndian>(self.seq)?;
        writer.write_u32::<LittleEndian>(self.payload.len() as u32)?;
        writer.write_u32::<LittleEndian>(crc32fast::hash(&self.payload))?;
        writer.write_all(&self.payload)?;
        Ok(())
    }

    /// Decode a frame from bytes
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < PREAMBLE_SIZE {
            return Err(ProtocolError::BufferTooShort {
                need: PREAMBLE_SIZE,
                have: data.len(),
            });
        }

        let preamble = Preamble::parse(&data[..PREAMBLE_SIZE])?;

        let total_needed = PREAMBLE_SIZE + preamble.payload_len;
        if data.len() < total_needed {
            return Err(ProtocolError::BufferTooShort {
                need: total_needed,
                have: data.len(),
            });
        }

        let payload = data[PREAMBLE_SIZE..total_needed].to_vec();
        preamble.into_frame(payload)
    }

    /// Read one frame from a byte stream.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly before a new frame starts.
    /// The payload is consumed before version, type and CRC are checked, so a
    /// rejected frame leaves the stream positioned at the next one. After a bad
    /// magic or an oversized length, [`Frame::skip_to_magic`] finds the next
    /// frame boundary.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        let mut magic = [0u8; 4];
        match fill(reader, &mut magic)? {
            0 => return Ok(None),
            n if n < magic.len() => {
                return Err(ProtocolError::BufferTooShort {
                    need: PREAMBLE_SIZE,
                    have: n,
                })
            }
            _ => {}
        }
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }
        Self::read_after_magic(reader).map(Some)
    }

    /// Discard bytes until a frame magic has been consumed.
    ///
    /// Returns how many bytes were discarded before the magic, and whether it
    /// was found before the stream ended.
    pub fn skip_to_magic<R: Read>(reader: &mut R) -> io::Result<(usize, bool)> {
        let mut window = [0u8; 4];
        let mut consumed = 0usize;
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) => return Ok((consumed, false)),
                Ok(_) => {
                    window.rotate_left(1);
                    window[3] = byte[0];
                    consumed += 1;
                    if consumed >= MAGIC.len() && window == MAGIC {
                        return Ok((consumed - MAGIC.len(), true));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Read the rest of a frame whose magic has just been consumed
    pub fn read_after_magic<R: Read>(reader: &mut R) -> Result<Self> {
        let mut preamble = [0u8; PREAMBLE_SIZE];
        preamble[..MAGIC.len()].copy_from_slice(&MAGIC);
        let filled = MAGIC.len() + fill(reader, &mut preamble[MAGIC.len()..])?;
        if filled < PREAMBLE_SIZE {
            return Err(ProtocolError::BufferTooShort {
                need: PREAMBLE_SIZE,
                have: filled,
            });
        }

        let preamble = Preamble::parse(&preamble)?;

        let mut payload = vec![0u8; preamble.payload_len];
        reader.read_exact(&mut payload).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ProtocolError::BufferTooShort {
                need: PREAMBLE_SIZE + preamble.payload_len,
                have: PREAMBLE_SIZE,
            },
            _ => e.into(),
        })?;

        preamble.into_frame(payload)
    }

    /// Get the total encoded size of this frame
    pub fn encoded_size(&self) -> usize {
        PREAMBLE_SIZE + self.payload.len()
    }
}

/// Read until `buf` is full or the stream ends; returns the bytes read
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = Frame::new(MsgType::ClassifyRequest, 42, vec![1, 2, 3, 4, 5]);

        let encoded = frame.encode();
        assert_eq!(encoded.len(), frame.encoded_size());
        assert_eq!(&encoded[..4], b"DGNT");

        let decoded = Frame::decode(&encoded).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_frame_empty_payload() {
        let frame = Frame::new(MsgType::Error, 0, vec![]);
        let decoded = Frame::decode(&frame.encode()).unwrap();
        assert_eq!(decoded.msg_type, MsgType::Error);
        assert_eq!(decoded.payload.len(), 0);
    }

    #[test]
    fn test_invalid_magic() {
        let mut encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![]).encode();
        encoded[0] = 0xFF;

        let result = Frame::decode(&encoded);
        assert!(matches!(result, Err(ProtocolError::InvalidMagic)));
    }

    #[test]
    fn test_version_mismatch() {
        let mut encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![]).encode();
        encoded[4] = 0x09;

        let result = Frame::decode(&encoded);
        assert!(matches!(
            result,
            Err(ProtocolError::VersionMismatch { expected: 1, got: 9 })
        ));
    }

    #[test]
    fn test_unknown_message_type() {
        let mut encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![]).encode();
        encoded[6] = 0x77;

        let result = Frame::decode(&encoded);
        assert!(matches!(result, Err(ProtocolError::UnknownMessageType(0x0077))));
    }

    #[test]
    fn test_payload_crc_mismatch() {
        let mut encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![1, 2, 3]).encode();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        let result = Frame::decode(&encoded);
        assert!(matches!(result, Err(ProtocolError::PayloadCrcMismatch { .. })));
    }

    #[test]
    fn test_truncated_buffers() {
        let encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![7; 10]).encode();

        assert!(matches!(
            Frame::decode(&encoded[..10]),
            Err(ProtocolError::BufferTooShort { need: 20, have: 10 })
        ));
        assert!(matches!(
            Frame::decode(&encoded[..25]),
            Err(ProtocolError::BufferTooShort { need: 30, have: 25 })
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![]).encode();
        encoded[12..16].copy_from_slice(&u32::MAX.to_le_bytes());

        let result = Frame::decode(&encoded);
        assert!(matches!(result, Err(ProtocolError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_read_from_stream() {
        let a = Frame::new(MsgType::ClassifyRequest, 1, vec![1; 4]);
        let b = Frame::new(MsgType::ClassifyResponse, 2, vec![2; 8]);
        let mut bytes = a.encode();
        bytes.extend(b.encode());

        let mut reader = Cursor::new(bytes);
        assert_eq!(Frame::read_from(&mut reader).unwrap(), Some(a));
        assert_eq!(Frame::read_from(&mut reader).unwrap(), Some(b));
        assert_eq!(Frame::read_from(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_read_from_resyncs_after_bad_crc() {
        let good = Frame::new(MsgType::ClassifyRequest, 2, vec![9; 3]);
        let mut bytes = Frame::new(MsgType::ClassifyRequest, 1, vec![1, 2, 3]).encode();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        bytes.extend(good.encode());

        let mut reader = Cursor::new(bytes);
        assert!(matches!(
            Frame::read_from(&mut reader),
            Err(ProtocolError::PayloadCrcMismatch { .. })
        ));
        assert_eq!(Frame::read_from(&mut reader).unwrap(), Some(good));
    }

    #[test]
    fn test_read_from_truncated() {
        let encoded = Frame::new(MsgType::ClassifyRequest, 1, vec![5; 16]).encode();

        let mut partial_preamble = Cursor::new(encoded[..8].to_vec());
        assert!(matches!(
            Frame::read_from(&mut partial_preamble),
            Err(ProtocolError::BufferTooShort { need: 20, have: 8 })
        ));

        let mut partial_payload = Cursor::new(encoded[..24].to_vec());
        assert!(matches!(
            Frame::read_from(&mut partial_payload),
            Err(ProtocolError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_skip_to_magic() {
        let frame = Frame::new(MsgType::ClassifyRequest, 7, vec![3; 6]);
        // Noise ending in a partial magic
        let mut bytes = vec![0x00, 0xA5, b'D'];
        bytes.extend(frame.encode());

        let mut reader = Cursor::new(bytes);
        assert_eq!(Frame::skip_to_magic(&mut reader).unwrap(), (3, true));
        assert_eq!(Frame::read_after_magic(&mut reader).unwrap(), frame);
        assert_eq!(Frame::skip_to_magic(&mut reader).unwrap(), (0, false));

        let mut tail = Cursor::new(b"xxDG".to_vec());
        assert_eq!(Frame::skip_to_magic(&mut tail).unwrap(), (4, false));
    }

    #[test]
    fn test_read_from_bad_magic_consumes_four_bytes() {
        let good = Frame::new(MsgType::ClassifyRequest, 2, vec![1]);
        let mut bytes = b"XXXX".to_vec();
        bytes.extend(good.encode());

        let mut reader = Cursor::new(bytes);
        assert!(matches!(
            Frame::read_from(&mut reader),
            Err(ProtocolError::InvalidMagic)
        ));
        assert_eq!(Frame::read_from(&mut reader).unwrap(), Some(good));
    }
}
