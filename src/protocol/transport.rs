//! SPI slave transport: frame assembly, message routing and last-byte storage

use super::{Event, ProtocolError, Result};
use crate::config::MessageIds;
use embedded_hal::spi::FullDuplex;

/// Size of the routing table; identifiers at or above it are never routed.
pub const MAX_MESSAGE_IDS: usize = 32;

/// Position inside the current two-byte frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    /// Next byte is a message id.
    Empty,
    /// Id received, payload expected.
    Id(u8),
    /// The id byte was corrupted; its payload is discarded.
    Corrupt,
}

pub struct Transport<SPI> {
    spi: SPI,
    routes: [Option<Event>; MAX_MESSAGE_IDS],
    contents: [u8; MAX_MESSAGE_IDS],
    frame: Frame,
    error: bool,
}

impl<SPI> Transport<SPI> {
    pub const fn new(spi: SPI) -> Self {
        Self {
            spi,
            routes: [None; MAX_MESSAGE_IDS],
            contents: [0; MAX_MESSAGE_IDS],
            frame: Frame::Empty,
            error: false,
        }
    }

    /// Routes `message_id` to `event`. A later registration for the same
    /// identifier replaces the earlier one.
    pub fn register(&mut self, message_id: u8, event: Event) -> Result<()> {
        let slot = self
            .routes
            .get_mut(message_id as usize)
            .ok_or(ProtocolError::UnknownMessage(message_id))?;
        *slot = Some(event);
        Ok(())
    }

    /// Registers every control message under its configured identifier.
    pub fn register_all(&mut self, ids: &MessageIds) -> Result<()> {
        for event in Event::ALL {
            self.register(event.message_id(ids), event)?;
        }
        Ok(())
    }

    pub fn route(&self, message_id: u8) -> Option<Event> {
        self.routes.get(message_id as usize).copied().flatten()
    }

    /// Returns the payload of the most recent frame for `message_id`.
    ///
    /// A pending framing error is reported once and then cleared.
    pub fn fetch_last_byte(&mut self, message_id: u8) -> Result<u8> {
        if self.error {
            self.error = false;
            return Err(ProtocolError::Framing);
        }
        if self.route(message_id).is_none() {
            return Err(ProtocolError::UnknownMessage(message_id));
        }
        Ok(self.contents[message_id as usize])
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Drops any partial frame. Called when the host deselects the slave,
    /// which it does after every frame.
    pub fn resync(&mut self) {
        self.frame = Frame::Empty;
    }

    pub fn spi_mut(&mut self) -> &mut SPI {
        &mut self.spi
    }
}

impl<SPI: FullDuplex<u8>> Transport<SPI> {
    /// Consumes one received byte.
    ///
    /// Returns the routed event once both bytes of a frame are in. Called from
    /// the SPI transfer-complete interrupt, so it never waits.
    pub fn poll(&mut self) -> nb::Result<Event, ProtocolError> {
        let byte = match self.spi.read() {
            Ok(byte) => Some(byte),
            Err(nb::Error::WouldBlock) => return Err(nb::Error::WouldBlock),
            Err(nb::Error::Other(_)) => None,
        };

        // A corrupted byte still occupies its slot, so frames stay aligned.
        match (self.frame, byte) {
            (Frame::Empty, Some(message_id)) => {
                self.frame = Frame::Id(message_id);
                Err(nb::Error::WouldBlock)
            }
            (Frame::Empty, None) => {
                self.frame = Frame::Corrupt;
                self.error = true;
                Err(nb::Error::Other(ProtocolError::Framing))
            }
            (Frame::Id(_), None) => {
                self.frame = Frame::Empty;
                self.error = true;
                Err(nb::Error::Other(ProtocolError::Framing))
            }
            (Frame::Corrupt, _) => {
                self.frame = Frame::Empty;
                Err(nb::Error::Other(ProtocolError::Framing))
            }
            (Frame::Id(message_id), Some(payload)) => {
                self.frame = Frame::Empty;
                match self.route(message_id) {
                    Some(event) => {
                        self.contents[message_id as usize] = payload;
                        self.error = false;
                        Ok(event)
                    }
                    None => Err(nb::Error::Other(ProtocolError::UnknownMessage(message_id))),
                }
            }
        }
    }
}
