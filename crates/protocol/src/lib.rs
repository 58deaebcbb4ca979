//! digitnet Device Link Protocol
//!
//! Wire format between a host and the device running inference: a fixed
//! preamble with magic, version, message type, sequence number, payload length
//! and payload CRC, followed by the payload.

mod constants;
mod error;
mod frame;
mod messages;

pub use constants::*;
pub use error::{ProtocolError, Result};
pub use frame::{Frame, PREAMBLE_SIZE};
pub use messages::*;
