//! SPI slave serviced from the transfer-complete interrupt

use super::gpio::board;
use avr_device::atmega128a::SPI;
use embedded_hal::spi::FullDuplex;

// SPCR
const SPIE: u8 = 1 << 7;
const SPE: u8 = 1 << 6;
// SPSR
const WCOL: u8 = 1 << 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// SPDR was written while a transfer was in progress
    Collision,
}

/// SPI peripheral in slave mode
pub struct Spi {
    _private: (),
}

impl Spi {
    /// Handle to the peripheral. Nothing is configured until
    /// [`configure_slave`](Self::configure_slave) runs.
    pub const fn detached() -> Self {
        Self { _private: () }
    }

    /// Slave, mode 0, MSB first, with the transfer-complete interrupt on.
    pub fn configure_slave(&mut self) {
        board::SPI_SS.into_input();
        board::SPI_MISO.into_output();
        unsafe {
            (*SPI::ptr()).spcr.write(|w| w.bits(SPIE | SPE));
        }
    }

    pub fn disable(&mut self) {
        unsafe {
            (*SPI::ptr()).spcr.write(|w| w.bits(0));
        }
    }
}

/// Reads are only meaningful inside `SPI_STC`, where the hardware has
/// already cleared SPIF and a byte is always waiting in SPDR.
impl FullDuplex<u8> for Spi {
    type Error = Error;

    fn read(&mut self) -> nb::Result<u8, Error> {
        let spi = unsafe { &*SPI::ptr() };
        // Reading SPSR then SPDR clears WCOL.
        let status = spi.spsr.read().bits();
        let byte = spi.spdr.read().bits();
        if status & WCOL != 0 {
            return Err(nb::Error::Other(Error::Collision));
        }
        Ok(byte)
    }

    fn send(&mut self, word: u8) -> nb::Result<(), Error> {
        unsafe {
            (*SPI::ptr()).spdr.write(|w| w.bits(word));
        }
        Ok(())
    }
}
