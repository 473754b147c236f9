use avr_device::atmega128a::WDT;

#[derive(Clone, Copy)]
#[repr(u8)]
pub enum WatchdogTimeout {
    Ms16 = 0,
    Ms32 = 1,
    Ms64 = 2,
    Ms125 = 3,
    Ms250 = 4,
    Ms500 = 5,
    Ms1000 = 6,
    Ms2000 = 7,
}

// WDTCR
const WDCE: u8 = 0x10;
const WDE: u8 = 0x08;

pub struct Watchdog {
    _private: (),
}

impl Watchdog {
    #[inline]
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[inline]
    pub fn start(&mut self, timeout: WatchdogTimeout) {
        unsafe {
            let p = WDT::ptr();
            (*p).wdtcr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcr.write(|w| w.bits(WDE | timeout as u8));
        }
    }

    #[inline]
    pub fn disable(&mut self) {
        avr_device::interrupt::free(|_| unsafe {
            let p = WDT::ptr();
            // Timed sequence: WDE must be cleared within four cycles
            (*p).wdtcr.write(|w| w.bits(WDCE | WDE));
            (*p).wdtcr.write(|w| w.bits(0x00));
        });
    }

    /// Resets the MCU through the shortest watchdog timeout.
    pub fn reset(&mut self) -> ! {
        avr_device::interrupt::disable();
        self.start(WatchdogTimeout::Ms16);
        loop {}
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}
