//! Simulated device: the serving loop that answers classify requests

use std::io::{Read, Write};

use digitnet_engine::{Engine, EngineError, InputImage};
use digitnet_model::QuantizedNetwork;
use digitnet_protocol::{
    ClassifyResponsePayload, ErrorCode, ErrorPayload, Frame, Message, Payload, ProtocolError,
};

use crate::error::Result;

/// Request counters of a serving session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// Requests answered with a classification
    pub served: u64,
    /// Frames answered with an error
    pub rejected: u64,
}

/// Host-side stand-in for the microcontroller: owns one quantized model and
/// answers each request frame with a response frame
pub struct DeviceSimulator {
    network: QuantizedNetwork,
    stats: ServeStats,
}

impl DeviceSimulator {
    pub fn new(network: QuantizedNetwork) -> Self {
        Self {
            network,
            stats: ServeStats::default(),
        }
    }

    pub fn network(&self) -> &QuantizedNetwork {
        &self.network
    }

    pub fn stats(&self) -> ServeStats {
        self.stats
    }

    /// Answer one encoded frame. Malformed input produces an error frame.
    pub fn handle_frame(&mut self, bytes: &[u8]) -> Vec<u8> {
        let reply = match Frame::decode(bytes) {
            Ok(frame) => self.respond(frame),
            Err(e) => self.reject(0, &e),
        };
        reply.encode()
    }

    /// Serve frames from a stream until it is closed.
    ///
    /// Frames that fail validation are answered with an error and skipped.
    /// Bytes that do not start a frame are discarded up to the next magic and
    /// answered with a single error, then serving resumes at that frame.
    pub fn serve<S: Read + Write>(&mut self, stream: &mut S) -> Result<ServeStats> {
        loop {
            let (skipped, found) = Frame::skip_to_magic(stream)?;
            if skipped > 0 {
                let reply = self.reject(0, &ProtocolError::LostSync { skipped });
                reply.write_to(stream)?;
                stream.flush()?;
            }
            if !found {
                break;
            }

            let reply = match Frame::read_after_magic(stream) {
                Ok(frame) => self.respond(frame),
                Err(ProtocolError::Io(e)) => return Err(e.into()),
                Err(e @ ProtocolError::BufferTooShort { .. }) => {
                    let reply = self.reject(0, &e);
                    reply.write_to(stream)?;
                    stream.flush()?;
                    break;
                }
                Err(e) => self.reject(0, &e),
            };
            reply.write_to(stream)?;
            stream.flush()?;
        }

        tracing::info!(
            served = self.stats.served,
            rejected = self.stats.rejected,
            "device link closed"
        );
        Ok(self.stats)
    }

    fn respond(&mut self, frame: Frame) -> Frame {
        let seq = frame.seq;
        let request = match Message::from_frame(frame) {
            Ok(Message::ClassifyRequest { payload, .. }) => payload,
            Ok(other) => {
                let e = ProtocolError::UnexpectedMessage {
                    expected: "ClassifyRequest",
                    got: other.kind().to_string(),
                };
                return self.reject(seq, &e);
            }
            Err(e) => return self.reject(seq, &e),
        };

        let image = InputImage::from_pixels(request.into_pixels());
        match Engine::new(&self.network).predict(&image) {
            Ok(prediction) => {
                self.stats.served += 1;
                tracing::debug!(seq, class = prediction.class, "classified");
                ClassifyResponsePayload::new(
                    prediction.class as u8,
                    prediction.logit_bits as i8,
                    prediction.logits,
                )
                .into_frame(seq)
            }
            Err(e @ EngineError::DimensionMismatch { .. }) => {
                self.stats.rejected += 1;
                tracing::warn!(seq, error = %e, "rejected request");
                ErrorPayload::new(ErrorCode::DimensionMismatch, e.to_string()).into_frame(seq)
            }
        }
    }

    fn reject(&mut self, seq: u32, error: &ProtocolError) -> Frame {
        self.stats.rejected += 1;
        tracing::warn!(seq, error = %error, "rejected frame");
        ErrorPayload::new(error.code(), error.to_string()).into_frame(seq)
    }
}
