#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[cfg(target_arch = "avr")]
mod firmware {
    use avr_device::interrupt::{self, Mutex};
    use core::cell::RefCell;
    use panic_halt as _;

    use spi_bootloader::bootloader::{
        launch, BootController, Bootloader, Dispatch, Handoff, Link, Reception,
    };
    use spi_bootloader::config::{BootConfig, MessageIds, BOOT_SECTION_START, IMAGE_CAPACITY};
    use spi_bootloader::drivers::flash::InternalFlash;
    use spi_bootloader::drivers::status::StatusLeds;
    use spi_bootloader::drivers::SerialConsole;
    use spi_bootloader::hal::{board, AvrBootController, Spi, Watchdog};

    // Shared between SPI_STC and the main loop
    static RECEPTION: Mutex<RefCell<Reception<Spi>>> = Mutex::new(RefCell::new(Reception::new(
        Spi::detached(),
        MessageIds::DEFAULT.data,
    )));

    /// Main-loop access to the reception state with interrupts held off.
    ///
    /// The host releases SS after every frame. Seeing it high means no frame
    /// is in flight, so any half-assembled one is dropped.
    struct IsrLink;

    impl Link for IsrLink {
        type Spi = Spi;

        fn with<R>(&mut self, f: impl FnOnce(&mut Reception<Spi>) -> R) -> R {
            interrupt::free(|cs| {
                let mut reception = RECEPTION.borrow(cs).borrow_mut();
                if board::SPI_SS.is_high() {
                    reception.resync();
                }
                f(&mut reception)
            })
        }
    }

    #[avr_device::interrupt(atmega128a)]
    fn SPI_STC() {
        let dispatch = interrupt::free(|cs| RECEPTION.borrow(cs).borrow_mut().on_interrupt());
        if dispatch == Dispatch::Restart {
            AvrBootController::new().restart();
        }
    }

    #[avr_device::entry]
    fn main() -> ! {
        let mut controller = AvrBootController::new();
        Watchdog::new().disable();
        controller.select_vector_table(BOOT_SECTION_START);

        let config = BootConfig::default();
        let mut link = IsrLink;
        // Routes must exist before the first byte can arrive; the bootloader
        // itself never registers them.
        if link.with(|reception| reception.register(&config.messages)).is_err() {
            controller.restart();
        }
        let mut bootloader: Bootloader<_, _, _, IMAGE_CAPACITY> = Bootloader::new(
            config,
            InternalFlash::new(),
            StatusLeds::new(),
            SerialConsole::new(),
        );

        Spi::detached().configure_slave();
        unsafe { interrupt::enable() };

        match bootloader.run(&mut link) {
            Ok(Handoff::Launch(bank)) => launch(&mut controller, &bank),
            Ok(Handoff::Restart) => controller.restart(),
            // Failure LEDs stay lit until the host sends a reset.
            Err(_) => loop {
                if link.with(|reception| reception.session().restart_requested()) {
                    controller.restart();
                }
            },
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
