//! Hand-off between the reception context and the main loop

use super::session::{Dispatch, Session};
use crate::config::MessageIds;
use crate::protocol::{self, ProtocolError, Transport};
use embedded_hal::spi::FullDuplex;

/// Everything the SPI interrupt touches: the session and the transport that
/// feeds it.
pub struct Reception<SPI> {
    session: Session,
    transport: Transport<SPI>,
    data_id: u8,
}

impl<SPI> Reception<SPI> {
    pub const fn new(spi: SPI, data_id: u8) -> Self {
        Self {
            session: Session::new(),
            transport: Transport::new(spi),
            data_id,
        }
    }

    /// Registers the control message routes.
    pub fn register(&mut self, ids: &MessageIds) -> protocol::Result<()> {
        self.data_id = ids.data;
        self.transport.register_all(ids)
    }

    /// Takes the pending data byte, clearing the pending indicator.
    ///
    /// The byte comes with its offset in the image, which is its position in
    /// the stream of data messages. Bytes lost to an overrun therefore leave
    /// a gap instead of shifting everything after them. `Err(_)` means the
    /// byte arrived but was corrupted on the wire.
    pub fn take_pending(&mut self) -> Option<(usize, Result<u8, ProtocolError>)> {
        if self.session.take_pending() {
            let offset = self.session.received().saturating_sub(1) as usize;
            Some((offset, self.transport.fetch_last_byte(self.data_id)))
        } else {
            None
        }
    }

    /// Forgets a partially received frame once the host deselects the slave.
    pub fn resync(&mut self) {
        self.transport.resync();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn transport_mut(&mut self) -> &mut Transport<SPI> {
        &mut self.transport
    }
}

impl<SPI: FullDuplex<u8>> Reception<SPI> {
    /// One step of the SPI interrupt: consume a byte and apply the event it
    /// completes, if any.
    pub fn on_interrupt(&mut self) -> Dispatch {
        match self.transport.poll() {
            Ok(event) => self.session.apply(event),
            Err(_) => Dispatch::Continue,
        }
    }
}

/// The main loop's only path to the reception state.
///
/// `with` runs the closure while the reception context is held off, so every
/// poll observes a consistent snapshot and the fetch-then-clear of a pending
/// byte cannot interleave with a new data event.
pub trait Link {
    type Spi: FullDuplex<u8>;

    fn with<R>(&mut self, f: impl FnOnce(&mut Reception<Self::Spi>) -> R) -> R;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootloader::session::UpdateState;
    use crate::testing::FaultySpi;

    fn data_frame(byte: u8) -> [Option<u8>; 2] {
        [Some(0x03), Some(byte)]
    }

    fn reception(bytes: &[Option<u8>]) -> Reception<FaultySpi> {
        let mut reception = Reception::new(FaultySpi::new(bytes), 0);
        reception.register(&MessageIds::default()).unwrap();
        reception
    }

    #[test]
    fn pending_byte_is_fetched_once() {
        let mut wire = vec![Some(0x01), Some(0x00)];
        wire.extend(data_frame(0x5A));
        let mut reception = reception(&wire);
        for _ in 0..4 {
            reception.on_interrupt();
        }

        assert_eq!(reception.session().state(), UpdateState::Receiving);
        assert_eq!(reception.take_pending(), Some((0, Ok(0x5A))));
        assert_eq!(reception.take_pending(), None);
    }

    #[test]
    fn second_byte_before_drain_overwrites_the_first() {
        let mut wire = vec![Some(0x01), Some(0x00)];
        wire.extend(data_frame(0x11));
        wire.extend(data_frame(0x22));
        let mut reception = reception(&wire);
        for _ in 0..6 {
            reception.on_interrupt();
        }

        assert_eq!(reception.session().received(), 2);
        assert_eq!(reception.session().overruns(), 1);
        assert_eq!(reception.take_pending(), Some((1, Ok(0x22))));
    }

    #[test]
    fn corrupted_frame_surfaces_on_fetch() {
        let mut wire = vec![Some(0x01), Some(0x00)];
        wire.extend(data_frame(0x11));
        wire.push(None);
        let mut reception = reception(&wire);
        for _ in 0..5 {
            reception.on_interrupt();
        }

        assert_eq!(reception.take_pending(), Some((0, Err(ProtocolError::Framing))));
    }

    #[test]
    fn reset_frame_requests_restart() {
        let mut reception = reception(&[Some(0x00), Some(0x00)]);

        assert_eq!(reception.on_interrupt(), Dispatch::Continue);
        assert_eq!(reception.on_interrupt(), Dispatch::Restart);
        assert!(reception.session().restart_requested());
    }

    #[test]
    fn resync_realigns_after_a_half_frame() {
        let mut wire = vec![Some(0x01), Some(0x00), Some(0x03)];
        let mut reception = reception(&wire);
        for _ in 0..3 {
            reception.on_interrupt();
        }
        reception.resync();

        wire = data_frame(0x77).to_vec();
        reception.transport_mut().spi_mut().feed(&wire);
        reception.on_interrupt();
        reception.on_interrupt();
        assert_eq!(reception.take_pending(), Some((0, Ok(0x77))));
    }
}
