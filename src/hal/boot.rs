//! Leaving the bootloader on the ATmega128

use super::spi::Spi;
use super::uart::Uart;
use super::watchdog::Watchdog;
use crate::bootloader::BootController;
use crate::config::BOOT_SECTION_START;
use avr_device::atmega128a::CPU;
use core::arch::asm;

// MCUCR
const IVCE: u8 = 0x01;
const IVSEL: u8 = 0x02;

pub struct AvrBootController {
    watchdog: Watchdog,
}

impl AvrBootController {
    pub fn new() -> Self {
        Self {
            watchdog: Watchdog::new(),
        }
    }
}

impl Default for AvrBootController {
    fn default() -> Self {
        Self::new()
    }
}

impl BootController for AvrBootController {
    fn quiesce(&mut self) {
        avr_device::interrupt::disable();
        Spi::detached().disable();
        Uart::detached().disable();
    }

    /// The interrupt table can only live at the start of flash or at the
    /// start of the boot section.
    fn select_vector_table(&mut self, address: u32) {
        let ivsel = if address >= BOOT_SECTION_START { IVSEL } else { 0 };
        avr_device::interrupt::free(|_| unsafe {
            let cpu = &*CPU::ptr();
            let base = cpu.mcucr.read().bits() & !(IVCE | IVSEL);
            // IVSEL must follow IVCE within four cycles
            cpu.mcucr.write(|w| w.bits(base | IVCE));
            cpu.mcucr.write(|w| w.bits(base | ivsel));
        });
    }

    fn transfer_control(&mut self, address: u32) -> ! {
        // ijmp takes a word address in Z
        let word = (address >> 1) as u16;
        unsafe { asm!("ijmp", in("Z") word, options(noreturn)) }
    }

    fn restart(&mut self) -> ! {
        self.watchdog.reset()
    }
}
