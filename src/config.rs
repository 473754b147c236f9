//! Configuration constants for the SPI bootloader

use crate::bootloader::bank::{BankDescriptor, FlashLayout};
use crate::logger::Level;

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// Console UART baud rate
pub const UART_BAUD: u32 = 9600;

/// Time window (in milliseconds) for the host to send START before an
/// existing application is launched
pub const START_TIMEOUT_MS: u32 = 10;

/// Busy-wait iterations of the start countdown that take roughly one
/// millisecond at `CPU_FREQ_HZ`. Each iteration enters a critical section and
/// samples the session, about 50 cycles on the ATmega128.
pub const SPINS_PER_MS: u32 = CPU_FREQ_HZ / 1000 / 50;

/// Bytes of SRAM reserved for staging an incoming image
pub const IMAGE_CAPACITY: usize = 2048;

/// Flash erase/program granularity (SPM page)
pub const FLASH_SECTOR_SIZE: u32 = 256;

/// Start of the boot section the bootloader itself runs from
pub const BOOT_SECTION_START: u32 = 0x1E000;

/// Flash page holding the run flag word, just below the boot section
pub const FLAG_ADDRESS: u32 = 0x1DF00;

/// First application bank: the application section from the reset vector up
/// to the flag page
pub const BANK_1_BASE: u32 = 0x0_0000;
pub const BANK_1_SIZE: u32 = FLAG_ADDRESS - BANK_1_BASE;

/// Number of bank slots in the flash layout
pub const MAX_BANKS: usize = 2;

/// Wire identifiers of the four control messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageIds {
    pub reset: u8,
    pub start: u8,
    pub end: u8,
    pub data: u8,
}

impl MessageIds {
    pub const DEFAULT: MessageIds = MessageIds {
        reset: 0x00,
        start: 0x01,
        end: 0x02,
        data: 0x03,
    };
}

impl Default for MessageIds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Runtime configuration of a bootloader instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    pub start_timeout_ms: u32,
    pub spins_per_ms: u32,
    pub messages: MessageIds,
    pub layout: FlashLayout,
    pub log_level: Level,
}

impl BootConfig {
    /// Number of countdown iterations before the start window closes.
    pub fn start_timeout_spins(&self) -> u32 {
        self.start_timeout_ms.saturating_mul(self.spins_per_ms)
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            start_timeout_ms: START_TIMEOUT_MS,
            spins_per_ms: SPINS_PER_MS,
            messages: MessageIds::default(),
            layout: FlashLayout::new(
                FLAG_ADDRESS,
                [Some(BankDescriptor::new(1, BANK_1_BASE, BANK_1_SIZE)), None],
            ),
            log_level: if cfg!(feature = "debug") {
                Level::Debug
            } else {
                Level::Info
            },
        }
    }
}
