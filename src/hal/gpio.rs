use avr_device::atmega128a::{PORTA, PORTB};
use core::marker::PhantomData;

pub trait PinMode {}
pub struct Input;
pub struct Output;
impl PinMode for Input {}
impl PinMode for Output {}

#[derive(Debug)]
pub struct Pin<PORT, const P: u8, MODE> {
    _port: PhantomData<PORT>,
    _mode: PhantomData<MODE>,
}

impl<PORT, const P: u8, MODE> Pin<PORT, P, MODE> {
    const fn detached() -> Self {
        Pin {
            _port: PhantomData,
            _mode: PhantomData,
        }
    }
}

macro_rules! impl_port {
    ($PORT:ident, $ddr:ident, $port:ident, $pin:ident) => {
        impl<const P: u8, MODE: PinMode> Pin<$PORT, P, MODE> {
            pub fn into_output(self) -> Pin<$PORT, P, Output> {
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() | (1 << P)));
                }
                Pin::detached()
            }

            pub fn into_input(self) -> Pin<$PORT, P, Input> {
                // Clear DDRx bit and disable pull-up
                unsafe {
                    (*$PORT::ptr()).$ddr.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                    (*$PORT::ptr()).$port.modify(|r, w| w.bits(r.bits() & !(1 << P)));
                }
                Pin::detached()
            }
        }

        impl<const P: u8> Pin<$PORT, P, Output> {
            #[inline]
            pub fn set(&mut self, high: bool) {
                unsafe {
                    (*$PORT::ptr()).$port.modify(|r, w| {
                        if high {
                            w.bits(r.bits() | (1 << P))
                        } else {
                            w.bits(r.bits() & !(1 << P))
                        }
                    });
                }
            }
        }

        impl<const P: u8> Pin<$PORT, P, Input> {
            #[inline]
            pub fn is_high(&self) -> bool {
                unsafe { (*$PORT::ptr()).$pin.read().bits() & (1 << P) != 0 }
            }
        }
    };
}

impl_port!(PORTA, ddra, porta, pina);
impl_port!(PORTB, ddrb, portb, pinb);

// Board pin assignments
pub mod board {
    use super::*;

    pub type LedPort = PORTA;

    pub const LED_RED: Pin<LedPort, 0, Input> = Pin::detached();
    pub const LED_GREEN: Pin<LedPort, 1, Input> = Pin::detached();
    pub const LED_BLUE: Pin<LedPort, 2, Input> = Pin::detached();

    /// Slave select, driven by the host
    pub const SPI_SS: Pin<PORTB, 0, Input> = Pin::detached();
    /// Must be an output for the slave to answer
    pub const SPI_MISO: Pin<PORTB, 3, Input> = Pin::detached();
}
