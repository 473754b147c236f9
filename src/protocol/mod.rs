//! Bootloader message protocol
//!
//! The host drives the bootloader with four control messages, each carried in
//! a two-byte SPI frame: the message identifier followed by one payload byte.
//! Only `data` frames carry meaningful payload.

pub mod transport;

pub use transport::Transport;

use crate::config::MessageIds;
use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// The last reception was corrupted; its byte is lost.
    Framing,
    /// No route is registered for this message identifier.
    UnknownMessage(u8),
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

impl uDisplay for ProtocolError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> core::result::Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            ProtocolError::Framing => f.write_str("framing error"),
            ProtocolError::UnknownMessage(id) => {
                f.write_str("unknown message ")?;
                uDisplay::fmt(id, f)
            }
        }
    }
}

/// Logical meaning of a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Unconditional device restart
    Reset,
    /// Begin receiving a new image
    Start,
    /// One image byte is available
    Data,
    /// The image is complete
    End,
}

impl Event {
    pub const ALL: [Event; 4] = [Event::Reset, Event::Start, Event::Data, Event::End];

    /// Wire identifier this event is carried under.
    pub fn message_id(self, ids: &MessageIds) -> u8 {
        match self {
            Event::Reset => ids.reset,
            Event::Start => ids.start,
            Event::Data => ids.data,
            Event::End => ids.end,
        }
    }
}
