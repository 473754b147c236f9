use crate::hal::Uart;
use core::convert::Infallible;

/// Log sink on USART0
pub struct SerialConsole {
    uart: Uart,
}

impl SerialConsole {
    pub fn new() -> Self {
        Self { uart: Uart::new() }
    }
}

impl Default for SerialConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ufmt::uWrite for SerialConsole {
    type Error = Infallible;

    fn write_str(&mut self, s: &str) -> Result<(), Infallible> {
        self.uart.write_str(s);
        Ok(())
    }
}
