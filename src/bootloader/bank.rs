//! Flash banks, the persisted run flag and the commit primitives

use crate::config::MAX_BANKS;
use crate::drivers::flash::{sectors_covering, FlashAccess, FlashError};
use ufmt::{uDisplay, uWrite, Formatter};

/// Static placement of one application bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankDescriptor {
    /// Value stored in the run flag to select this bank
    pub id: u32,
    pub base: u32,
    pub size: u32,
}

impl BankDescriptor {
    pub const fn new(id: u32, base: u32, size: u32) -> Self {
        Self { id, base, size }
    }

    pub fn end(&self) -> u32 {
        self.base + self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    pub flag_address: u32,
    pub banks: [Option<BankDescriptor>; MAX_BANKS],
}

impl FlashLayout {
    pub const fn new(flag_address: u32, banks: [Option<BankDescriptor>; MAX_BANKS]) -> Self {
        Self {
            flag_address,
            banks,
        }
    }

    /// Enabled bank carrying flag value `id`.
    pub fn bank(&self, id: u32) -> Option<&BankDescriptor> {
        self.banks.iter().flatten().find(|bank| bank.id == id)
    }

    /// Bank a received image is written to. Only the first enabled bank is
    /// ever targeted.
    pub fn update_target(&self) -> Option<&BankDescriptor> {
        self.banks.iter().flatten().next()
    }
}

/// Persisted selector of the bank allowed to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFlag {
    Unset,
    Bank(u32),
}

impl RunFlag {
    const ERASED: u32 = 0xFFFF_FFFF;

    pub fn from_word(word: u32) -> Self {
        match word {
            0 | Self::ERASED => RunFlag::Unset,
            id => RunFlag::Bank(id),
        }
    }

    pub fn to_word(self) -> u32 {
        match self {
            RunFlag::Unset => 0,
            RunFlag::Bank(id) => id,
        }
    }
}

impl uDisplay for RunFlag {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match *self {
            RunFlag::Unset => f.write_str("unset"),
            RunFlag::Bank(id) => {
                f.write_str("bank ")?;
                uDisplay::fmt(&id, f)
            }
        }
    }
}

pub fn read_run_flag<F: FlashAccess>(
    flash: &mut F,
    layout: &FlashLayout,
) -> Result<RunFlag, FlashError> {
    let mut word = [0u8; 4];
    flash.read(layout.flag_address, &mut word)?;
    Ok(RunFlag::from_word(u32::from_le_bytes(word)))
}

/// Erases the flag sector and programs the new flag word.
pub fn write_run_flag<F: FlashAccess>(
    flash: &mut F,
    layout: &FlashLayout,
    flag: RunFlag,
) -> Result<(), FlashError> {
    flash.erase_sector(layout.flag_address)?;
    flash.program(layout.flag_address, &flag.to_word().to_le_bytes())
}

/// Erases every sector of `bank` covering `[base, base + erase_len)`, then
/// programs `image` from the bank base. Nothing is read back.
pub fn write_image<F: FlashAccess>(
    flash: &mut F,
    bank: &BankDescriptor,
    image: &[u8],
    erase_len: u32,
) -> Result<(), FlashError> {
    if image.len() as u32 > bank.size {
        return Err(FlashError::OutOfRange(bank.base + bank.size));
    }
    let erase_len = erase_len.min(bank.size);

    for sector in sectors_covering(bank.base, erase_len, F::SECTOR_SIZE) {
        flash.erase_sector(sector)?;
    }
    flash.program(bank.base, image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FlashOp, MemFlash};

    const LAYOUT: FlashLayout = FlashLayout::new(
        0x1DF00,
        [Some(BankDescriptor::new(1, 0x0000, 0x1000)), None],
    );

    #[test]
    fn flag_words_decode() {
        assert_eq!(RunFlag::from_word(0), RunFlag::Unset);
        assert_eq!(RunFlag::from_word(0xFFFF_FFFF), RunFlag::Unset);
        assert_eq!(RunFlag::from_word(1), RunFlag::Bank(1));
        assert_eq!(RunFlag::from_word(2), RunFlag::Bank(2));
    }

    #[test]
    fn disabled_bank_is_not_selectable() {
        assert!(LAYOUT.bank(1).is_some());
        assert!(LAYOUT.bank(2).is_none());
        assert_eq!(LAYOUT.update_target().map(|bank| bank.id), Some(1));
    }

    #[test]
    fn erased_flash_reads_as_unset() {
        let mut flash = MemFlash::new();
        assert_eq!(read_run_flag(&mut flash, &LAYOUT), Ok(RunFlag::Unset));
    }

    #[test]
    fn run_flag_survives_rewrite() {
        let mut flash = MemFlash::new();
        write_run_flag(&mut flash, &LAYOUT, RunFlag::Bank(1)).unwrap();
        assert_eq!(read_run_flag(&mut flash, &LAYOUT), Ok(RunFlag::Bank(1)));

        write_run_flag(&mut flash, &LAYOUT, RunFlag::Unset).unwrap();
        assert_eq!(read_run_flag(&mut flash, &LAYOUT), Ok(RunFlag::Unset));

        assert_eq!(
            &flash.ops()[..2],
            &[FlashOp::Erase(0x1DF00), FlashOp::Program(0x1DF00, 4)]
        );
    }

    #[test]
    fn image_write_erases_before_programming() {
        let mut flash = MemFlash::new();
        let bank = LAYOUT.update_target().unwrap();
        let image: Vec<u8> = (0..300u32).map(|i| i as u8).collect();

        write_image(&mut flash, bank, &image, 300).unwrap();

        assert_eq!(
            flash.ops(),
            &[
                FlashOp::Erase(0x000),
                FlashOp::Erase(0x100),
                FlashOp::Program(0x000, 300),
            ]
        );
        assert_eq!(flash.contents(0, 300), &image[..]);
    }

    #[test]
    fn image_larger_than_bank_is_refused() {
        let mut flash = MemFlash::new();
        let bank = BankDescriptor::new(1, 0x0000, 4);

        assert_eq!(
            write_image(&mut flash, &bank, &[0; 5], 5),
            Err(FlashError::OutOfRange(4))
        );
        assert!(flash.ops().is_empty());
    }

    #[test]
    fn erase_failure_stops_before_programming() {
        let mut flash = MemFlash::new();
        flash.fail_erase_at(0x100);
        let bank = LAYOUT.update_target().unwrap();

        assert_eq!(
            write_image(&mut flash, bank, &[0xAA; 300], 300),
            Err(FlashError::EraseFailed(0x100))
        );
        assert_eq!(flash.ops(), &[FlashOp::Erase(0x000)]);
    }
}
