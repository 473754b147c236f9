//! Flash access for the commit sequence
//!
//! The bootloader only needs three primitives: erase the sector holding an
//! address, program a byte range into erased flash, and read back. Each call
//! blocks until the hardware is done.

use crate::logger::Hex;
use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashError {
    EraseFailed(u32),
    ProgramFailed(u32),
    ReadFailed(u32),
    OutOfRange(u32),
}

impl uDisplay for FlashError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        let (what, address) = match *self {
            FlashError::EraseFailed(address) => ("erase failed at ", address),
            FlashError::ProgramFailed(address) => ("program failed at ", address),
            FlashError::ReadFailed(address) => ("read failed at ", address),
            FlashError::OutOfRange(address) => ("out of range: ", address),
        };
        f.write_str(what)?;
        uDisplay::fmt(&Hex(address), f)
    }
}

pub trait FlashAccess {
    /// Erase granularity in bytes; a power of two.
    const SECTOR_SIZE: u32;

    /// Erases the whole sector containing `address`.
    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError>;

    /// Programs `data` starting at `address`. The range must be erased.
    fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError>;

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError>;
}

/// Base addresses of every sector overlapping `[address, address + len)`.
pub fn sectors_covering(address: u32, len: u32, sector_size: u32) -> impl Iterator<Item = u32> {
    let first = address & !(sector_size - 1);
    let end = if len == 0 { first } else { address.saturating_add(len) };
    (first..end).step_by(sector_size as usize)
}

#[cfg(target_arch = "avr")]
pub use self::avr::InternalFlash;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{FlashAccess, FlashError};
    use crate::config::{BOOT_SECTION_START, FLASH_SECTOR_SIZE};
    use core::arch::asm;

    const PAGE_SIZE: usize = FLASH_SECTOR_SIZE as usize;

    // SPMCSR command bits
    const SPMEN: u8 = 0x01;
    const PGERS: u8 = 0x02;
    const PGWRT: u8 = 0x04;
    const RWWSRE: u8 = 0x10;

    // Data-space addresses of SPMCSR and RAMPZ
    const SPMCSR: *mut u8 = 0x68 as *mut u8;
    const RAMPZ: *mut u8 = 0x5B as *mut u8;

    /// Self-programming access to the application section
    pub struct InternalFlash {
        _private: (),
    }

    impl InternalFlash {
        pub fn new() -> Self {
            Self { _private: () }
        }

        fn check(address: u32, len: usize) -> Result<(), FlashError> {
            let end = address.checked_add(len as u32).ok_or(FlashError::OutOfRange(address))?;
            if end > BOOT_SECTION_START {
                return Err(FlashError::OutOfRange(address));
            }
            Ok(())
        }

        fn wait_spm() {
            unsafe { while core::ptr::read_volatile(SPMCSR) & SPMEN != 0 {} }
        }

        /// Issues one SPM command with Z pointing at `address`.
        unsafe fn spm(address: u32, command: u8) {
            avr_device::interrupt::free(|_| {
                core::ptr::write_volatile(RAMPZ, (address >> 16) as u8);
                asm!(
                    "sts 0x68, {cmd}",
                    "spm",
                    cmd = in(reg) command,
                    in("Z") address as u16,
                );
            });
            Self::wait_spm();
        }

        /// Loads one word into the temporary page buffer.
        unsafe fn fill(address: u32, word: u16) {
            avr_device::interrupt::free(|_| {
                asm!(
                    "movw r0, {word}",
                    "sts 0x68, {cmd}",
                    "spm",
                    "clr r1",
                    word = in(reg_pair) word,
                    cmd = in(reg) SPMEN,
                    in("Z") address as u16,
                );
            });
            Self::wait_spm();
        }

        fn read_byte(address: u32) -> u8 {
            let byte: u8;
            unsafe {
                core::ptr::write_volatile(RAMPZ, (address >> 16) as u8);
                asm!(
                    "elpm {byte}, Z",
                    byte = out(reg) byte,
                    in("Z") address as u16,
                );
            }
            byte
        }

        fn enable_rww() {
            unsafe { Self::spm(0, RWWSRE | SPMEN) }
        }
    }

    impl Default for InternalFlash {
        fn default() -> Self {
            Self::new()
        }
    }

    impl FlashAccess for InternalFlash {
        const SECTOR_SIZE: u32 = FLASH_SECTOR_SIZE;

        fn erase_sector(&mut self, address: u32) -> Result<(), FlashError> {
            let page = address & !(Self::SECTOR_SIZE - 1);
            Self::check(page, PAGE_SIZE)?;
            unsafe { Self::spm(page, PGERS | SPMEN) };
            Self::enable_rww();
            Ok(())
        }

        fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
            Self::check(address, data.len())?;
            let end = address + data.len() as u32;
            let mut page = address & !(Self::SECTOR_SIZE - 1);

            while page < end {
                // Bytes outside `data` keep their current flash contents.
                for offset in (0..Self::SECTOR_SIZE).step_by(2) {
                    let mut word = [0u8; 2];
                    for (i, slot) in word.iter_mut().enumerate() {
                        let at = page + offset + i as u32;
                        *slot = if (address..end).contains(&at) {
                            data[(at - address) as usize]
                        } else {
                            Self::read_byte(at)
                        };
                    }
                    unsafe { Self::fill(page + offset, u16::from_le_bytes(word)) };
                }
                unsafe { Self::spm(page, PGWRT | SPMEN) };
                Self::enable_rww();

                let written = page.max(address)..(page + Self::SECTOR_SIZE).min(end);
                if written
                    .clone()
                    .any(|at| Self::read_byte(at) != data[(at - address) as usize])
                {
                    return Err(FlashError::ProgramFailed(page));
                }
                page += Self::SECTOR_SIZE;
            }
            Ok(())
        }

        fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
            let end = address
                .checked_add(buffer.len() as u32)
                .ok_or(FlashError::ReadFailed(address))?;
            if end > 0x2_0000 {
                return Err(FlashError::ReadFailed(address));
            }
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = Self::read_byte(address + i as u32);
            }
            Ok(())
        }
    }
}
