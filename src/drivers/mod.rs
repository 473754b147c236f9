pub mod flash;
#[cfg(target_arch = "avr")]
pub mod serial_console;
pub mod status;

pub use flash::{FlashAccess, FlashError};
#[cfg(target_arch = "avr")]
pub use serial_console::SerialConsole;
pub use status::{Led, Phase, StatusIndicator};
