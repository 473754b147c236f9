pub mod boot;
pub mod gpio;
pub mod spi;
pub mod uart;
pub mod watchdog;

pub use boot::AvrBootController;
pub use gpio::{board, Input, Output, Pin};
pub use spi::Spi;
pub use uart::Uart;
pub use watchdog::{Watchdog, WatchdogTimeout};
