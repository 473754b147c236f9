use crate::config::{CPU_FREQ_HZ, UART_BAUD};
use avr_device::atmega128a::USART0;

const UBRR: u16 = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u16;

// UCSR0A
const TXC: u8 = 1 << 6;
const UDRE: u8 = 1 << 5;
// UCSR0B
const TXEN: u8 = 1 << 3;
// UCSR0C: asynchronous, 8N1
const CHAR_8BIT: u8 = 0b0000_0110;

// Upper bound on the wait for the last frame to leave the shift register
const DRAIN_SPINS: u32 = CPU_FREQ_HZ / UART_BAUD * 10;

/// Transmit-only USART0, polled
pub struct Uart {
    _private: (),
}

impl Uart {
    pub fn new() -> Self {
        unsafe {
            let p = &*USART0::ptr();
            p.ubrr0h.write(|w| w.bits((UBRR >> 8) as u8));
            p.ubrr0l.write(|w| w.bits(UBRR as u8));
            p.ucsr0c.write(|w| w.bits(CHAR_8BIT));
            p.ucsr0b.write(|w| w.bits(TXEN));
        }
        Self { _private: () }
    }

    /// Handle to an already configured USART0.
    pub const fn detached() -> Self {
        Self { _private: () }
    }

    pub fn write_byte(&mut self, byte: u8) {
        unsafe {
            let p = &*USART0::ptr();
            while p.ucsr0a.read().bits() & UDRE == 0 {}
            // Writing one clears TXC, so it marks the end of this byte.
            p.ucsr0a.write(|w| w.bits(TXC));
            p.udr0.write(|w| w.bits(byte));
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    /// Lets the last byte finish, then turns the transmitter off and hands
    /// the TXD pin back to the port.
    pub fn disable(&mut self) {
        unsafe {
            let p = &*USART0::ptr();
            while p.ucsr0a.read().bits() & UDRE == 0 {}
            for _ in 0..DRAIN_SPINS {
                if p.ucsr0a.read().bits() & TXC != 0 {
                    break;
                }
            }
            p.ucsr0b.write(|w| w.bits(0));
        }
    }
}

impl Default for Uart {
    fn default() -> Self {
        Self::new()
    }
}
