//! Host side of the device link

use std::io::{Read, Write};

use digitnet_engine::{InputImage, Prediction};
use digitnet_protocol::{ClassifyRequestPayload, Frame, Message, Payload, ProtocolError};

use crate::device::DeviceSimulator;
use crate::error::{HarnessError, Result};

/// Sends one image to a device and waits for its classification
pub trait Transport {
    fn send(&mut self, image: &InputImage) -> Result<Prediction>;
}

fn request_frame(seq: u32, image: &InputImage) -> Result<Frame> {
    Ok(ClassifyRequestPayload::new(image.pixels().to_vec())?.into_frame(seq))
}

/// Turn a reply frame into a prediction, checking it answers `seq`
fn parse_reply(seq: u32, frame: Frame) -> Result<Prediction> {
    let message = Message::from_frame(frame)?;
    if message.seq() != seq {
        return Err(HarnessError::SequenceMismatch {
            expected: seq,
            got: message.seq(),
        });
    }

    match message {
        Message::ClassifyResponse { payload, .. } => Ok(Prediction {
            class: payload.class as usize,
            logits: payload.logits,
            logit_bits: payload.logit_bits as i32,
        }),
        Message::Error { payload, .. } => Err(payload.into_error().into()),
        other => Err(ProtocolError::UnexpectedMessage {
            expected: "ClassifyResponse",
            got: other.kind().to_string(),
        }
        .into()),
    }
}

/// In-process link to a [`DeviceSimulator`], going through the full encoding
pub struct LoopbackTransport {
    device: DeviceSimulator,
    seq: u32,
}

impl LoopbackTransport {
    pub fn new(device: DeviceSimulator) -> Self {
        Self { device, seq: 0 }
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, image: &InputImage) -> Result<Prediction> {
        self.seq = self.seq.wrapping_add(1);
        let reply = self.device.handle_frame(&request_frame(self.seq, image)?.encode());
        parse_reply(self.seq, Frame::decode(&reply)?)
    }
}

/// Link over any byte stream, such as a serial port or TCP socket
pub struct StreamTransport<S> {
    stream: S,
    seq: u32,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, seq: 0 }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn send(&mut self, image: &InputImage) -> Result<Prediction> {
        self.seq = self.seq.wrapping_add(1);
        self.stream
            .write_all(&request_frame(self.seq, image)?.encode())?;
        self.stream.flush()?;

        let reply = Frame::read_from(&mut self.stream)?.ok_or_else(|| {
            HarnessError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "device closed the link",
            ))
        })?;
        parse_reply(self.seq, reply)
    }
}
