//! Leveled console logging over any `ufmt` sink

use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Error => "[ERR] ",
            Level::Warn => "[WRN] ",
            Level::Info => "[INF] ",
            Level::Debug => "[DBG] ",
        }
    }
}

pub struct Logger<W> {
    sink: W,
    max_level: Level,
}

impl<W: uWrite> Logger<W> {
    pub fn new(sink: W, max_level: Level) -> Self {
        Self { sink, max_level }
    }

    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        level <= self.max_level
    }

    /// Writes the level tag that starts every line.
    pub fn begin(&mut self, level: Level) -> Result<(), W::Error> {
        self.sink.write_str(level.tag())
    }

    pub fn end(&mut self) -> Result<(), W::Error> {
        self.sink.write_str("\r\n")
    }

    pub fn sink(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }
}

/// Renders a value as `0x` followed by eight hex digits.
#[derive(Clone, Copy)]
pub struct Hex(pub u32);

impl uDisplay for Hex {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const HEX_CHARS: [u8; 16] = *b"0123456789abcdef";

        let mut buf = *b"0x00000000";
        for (i, slot) in buf[2..].iter_mut().enumerate() {
            let nibble = (self.0 >> (28 - 4 * i)) & 0xF;
            *slot = HEX_CHARS[nibble as usize];
        }
        f.write_str(core::str::from_utf8(&buf).unwrap_or("0x????????"))
    }
}

#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &mut $logger;
        let level = $level;
        if logger.enabled(level) {
            let _ = logger.begin(level);
            let _ = ufmt::uwrite!(logger.sink(), $($arg)+);
            let _ = logger.end();
        }
    }};
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::logger::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::logger::Level::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::logger::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::logger::Level::Debug, $($arg)+)
    };
}
