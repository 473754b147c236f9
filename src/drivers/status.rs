//! Status LEDs showing bootloader progress

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Led {
    Red,
    Green,
    Blue,
}

impl Led {
    pub const ALL: [Led; 3] = [Led::Red, Led::Green, Led::Blue];
}

/// Bootloader phases and the LED combination shown for each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Start window open, waiting for the host (red + green)
    Waiting,
    /// Image bytes arriving (blue)
    Receiving,
    /// Writing flash (red)
    Committing,
    /// Image and run flag written (green)
    Committed,
    /// Session failed, waiting for a reset (red + blue)
    Failed,
    /// About to leave the bootloader (all off)
    Launching,
}

impl Phase {
    pub fn lit(self, led: Led) -> bool {
        matches!(
            (self, led),
            (Phase::Waiting, Led::Red | Led::Green)
                | (Phase::Receiving, Led::Blue)
                | (Phase::Committing, Led::Red)
                | (Phase::Committed, Led::Green)
                | (Phase::Failed, Led::Red | Led::Blue)
        )
    }
}

pub trait StatusIndicator {
    fn set(&mut self, led: Led, on: bool);

    fn show(&mut self, phase: Phase) {
        for led in Led::ALL {
            self.set(led, phase.lit(led));
        }
    }
}

#[cfg(target_arch = "avr")]
pub use self::avr::StatusLeds;

#[cfg(target_arch = "avr")]
mod avr {
    use super::{Led, StatusIndicator};
    use crate::hal::gpio::{board, Output, Pin};

    /// RGB status LED on PORTA
    pub struct StatusLeds {
        red: Pin<board::LedPort, 0, Output>,
        green: Pin<board::LedPort, 1, Output>,
        blue: Pin<board::LedPort, 2, Output>,
    }

    impl StatusLeds {
        pub fn new() -> Self {
            Self {
                red: board::LED_RED.into_output(),
                green: board::LED_GREEN.into_output(),
                blue: board::LED_BLUE.into_output(),
            }
        }
    }

    impl Default for StatusLeds {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StatusIndicator for StatusLeds {
        fn set(&mut self, led: Led, on: bool) {
            match led {
                Led::Red => self.red.set(on),
                Led::Green => self.green.set(on),
                Led::Blue => self.blue.set(on),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingLeds;

    #[test]
    fn phases_light_the_expected_leds() {
        let mut leds = RecordingLeds::default();

        leds.show(Phase::Waiting);
        assert_eq!(leds.lit(), [Led::Red, Led::Green]);
        leds.show(Phase::Receiving);
        assert_eq!(leds.lit(), [Led::Blue]);
        leds.show(Phase::Committing);
        assert_eq!(leds.lit(), [Led::Red]);
        leds.show(Phase::Committed);
        assert_eq!(leds.lit(), [Led::Green]);
        leds.show(Phase::Failed);
        assert_eq!(leds.lit(), [Led::Red, Led::Blue]);
        leds.show(Phase::Launching);
        assert!(leds.lit().is_empty());
    }
}
