//! Terminal actions: restarting and handing the CPU to an application

use super::bank::BankDescriptor;

/// The only non-portable leaf of the bootloader.
pub trait BootController {
    /// Masks interrupts and stops every peripheral the bootloader started,
    /// so nothing reaches the application before it initialises.
    fn quiesce(&mut self);

    /// Points interrupt dispatch at the vector table located at `address`.
    fn select_vector_table(&mut self, address: u32);

    /// Enters the image whose vector table starts at `address`.
    fn transfer_control(&mut self, address: u32) -> !;

    fn restart(&mut self) -> !;
}

/// Starts the application in `bank`.
pub fn launch<B: BootController>(controller: &mut B, bank: &BankDescriptor) -> ! {
    controller.quiesce();
    controller.select_vector_table(bank.base);
    controller.transfer_control(bank.base)
}
