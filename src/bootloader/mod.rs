//! Second-stage bootloader
//!
//! On entry the persisted run flag is read and a short start window opens.
//! If the host sends START inside the window, or no runnable image exists,
//! an image is received byte by byte into SRAM, written to the update bank,
//! the run flag is pointed at that bank and the new image is launched.
//! Otherwise the flagged bank is launched directly.
//!
//! Received images are not checksummed and flash writes are not read back
//! by this module. Any such check belongs to the flash driver.

pub mod bank;
pub mod control;
pub mod image;
pub mod link;
pub mod session;


pub use bank::{BankDescriptor, FlashLayout, RunFlag};
pub use control::{launch, BootController};
pub use image::ImageBuffer;
pub use link::{Link, Reception};
pub use session::{Dispatch, Session, UpdateState};

use crate::config::BootConfig;
use crate::drivers::flash::{FlashAccess, FlashError};
use crate::drivers::status::{Phase, StatusIndicator};
use crate::logger::{Hex, Logger};
use crate::{debug, error, info, warn};
use ufmt::{uDisplay, uWrite, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Flash erase or program failed; the bank content is undefined.
    Flash(FlashError),
    /// The image does not fit the staging buffer or the bank.
    ImageOverflow { capacity: u32 },
    /// END arrived before any byte was stored.
    EmptyImage,
    /// The layout has no enabled bank to write to.
    NoBank,
}

impl From<FlashError> for BootError {
    fn from(err: FlashError) -> Self {
        BootError::Flash(err)
    }
}

impl uDisplay for BootError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            BootError::Flash(err) => {
                f.write_str("flash ")?;
                uDisplay::fmt(err, f)
            }
            BootError::ImageOverflow { capacity } => {
                f.write_str("image exceeds ")?;
                uDisplay::fmt(capacity, f)?;
                f.write_str(" bytes")
            }
            BootError::EmptyImage => f.write_str("empty image"),
            BootError::NoBank => f.write_str("no bank enabled"),
        }
    }
}

/// How the bootloader must be left
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    /// Jump into the application in this bank.
    Launch(BankDescriptor),
    /// A reset message was received.
    Restart,
}

enum Selection {
    Launch(BankDescriptor),
    Receive,
    Restart,
}

enum Flow {
    Complete,
    Restart,
}

pub struct Bootloader<F, S, W, const N: usize> {
    config: BootConfig,
    flash: F,
    status: S,
    log: Logger<W>,
    image: ImageBuffer<N>,
    dropped: u32,
}

impl<F, S, W, const N: usize> Bootloader<F, S, W, N>
where
    F: FlashAccess,
    S: StatusIndicator,
    W: uWrite,
{
    pub fn new(config: BootConfig, flash: F, status: S, console: W) -> Self {
        Self {
            log: Logger::new(console, config.log_level),
            config,
            flash,
            status,
            image: ImageBuffer::new(),
            dropped: 0,
        }
    }

    /// Runs the bootloader until it has to be left.
    ///
    /// Message routes must already be registered on `link`. Returns the terminal action for the caller to perform. On error the
    /// failure indicator is lit and nothing more is written to flash.
    pub fn run<L: Link>(&mut self, link: &mut L) -> Result<Handoff, BootError> {
        let result = self.run_session(link);
        if let Err(err) = &result {
            self.status.show(Phase::Failed);
            error!(self.log, "update failed: {}", err);
        }
        result
    }

    fn run_session<L: Link>(&mut self, link: &mut L) -> Result<Handoff, BootError> {
        self.status.show(Phase::Waiting);
        info!(self.log, "spi bootloader v{}", env!("CARGO_PKG_VERSION"));

        let flag = bank::read_run_flag(&mut self.flash, &self.config.layout)?;
        info!(self.log, "run flag: {}", flag);

        match self.select(link, flag) {
            Selection::Launch(bank) => {
                info!(self.log, "launching bank {} at {}", bank.id, Hex(bank.base));
                self.status.show(Phase::Launching);
                return Ok(Handoff::Launch(bank));
            }
            Selection::Restart => return Ok(Handoff::Restart),
            Selection::Receive => {}
        }

        let bank = *self.config.layout.update_target().ok_or(BootError::NoBank)?;
        // No console output until END: a blocking log line would overrun
        // the incoming bytes.
        self.status.show(Phase::Receiving);

        if let Flow::Restart = self.receive(link, &bank)? {
            return Ok(Handoff::Restart);
        }

        self.commit(link, &bank)?;
        info!(self.log, "launching bank {} at {}", bank.id, Hex(bank.base));
        Ok(Handoff::Launch(bank))
    }

    /// Start window: busy-waits for START for a fixed number of polls, then
    /// either picks the flagged bank or keeps waiting for an update.
    fn select<L: Link>(&mut self, link: &mut L, flag: RunFlag) -> Selection {
        let mut countdown = self.config.start_timeout_spins();
        let mut state = UpdateState::Idle;

        while countdown > 0 {
            let (now, restart) = poll_state(link);
            if restart {
                return Selection::Restart;
            }
            state = now;
            if state != UpdateState::Idle {
                break;
            }
            countdown -= 1;
        }

        if state == UpdateState::Idle {
            match flag {
                RunFlag::Bank(id) => match self.config.layout.bank(id) {
                    Some(bank) => return Selection::Launch(*bank),
                    None => warn!(self.log, "run flag names disabled bank {}", id),
                },
                RunFlag::Unset => info!(self.log, "no runnable image"),
            }

            debug!(self.log, "waiting for start");
            loop {
                let (now, restart) = poll_state(link);
                if restart {
                    return Selection::Restart;
                }
                if now != UpdateState::Idle {
                    break;
                }
            }
        }
        Selection::Receive
    }

    /// Drains pending bytes into the image buffer until END. Each byte is
    /// placed at its position in the data stream.
    fn receive<L: Link>(&mut self, link: &mut L, bank: &BankDescriptor) -> Result<Flow, BootError> {
        self.image.begin(bank.size as usize);
        self.dropped = 0;

        loop {
            let (pending, state, restart) = link.with(|reception| {
                let pending = reception.take_pending();
                let session = reception.session();
                (pending, session.state(), session.restart_requested())
            });
            if restart {
                return Ok(Flow::Restart);
            }

            let stored = match pending {
                Some((offset, Ok(byte))) => self.image.store(offset, byte),
                Some((offset, Err(_))) => {
                    self.dropped += 1;
                    self.image.skip(offset)
                }
                // END is only acted on once no byte is left pending.
                None if state != UpdateState::Receiving => return Ok(Flow::Complete),
                None => Ok(()),
            };
            stored.map_err(|overflow| BootError::ImageOverflow {
                capacity: overflow.capacity as u32,
            })?;
        }
    }

    /// Writes the received image into `bank` and marks it runnable.
    fn commit<L: Link>(&mut self, link: &mut L, bank: &BankDescriptor) -> Result<(), BootError> {
        let (received, overruns) = link.with(|reception| {
            let session = reception.session();
            (session.received(), session.overruns())
        });
        info!(
            self.log,
            "received {} bytes for bank {}, image is {} bytes",
            received,
            bank.id,
            self.image.len()
        );
        if overruns > 0 || self.dropped > 0 {
            warn!(
                self.log,
                "{} bytes overrun, {} corrupted",
                overruns,
                self.dropped
            );
        }
        if self.image.is_empty() {
            return Err(BootError::EmptyImage);
        }

        self.status.show(Phase::Committing);
        debug!(self.log, "writing {} bytes at {}", self.image.len(), Hex(bank.base));
        bank::write_image(&mut self.flash, bank, self.image.as_slice(), received)?;

        link.with(|reception| reception.session_mut().reset_received());

        bank::write_run_flag(&mut self.flash, &self.config.layout, RunFlag::Bank(bank.id))?;
        info!(self.log, "run flag set to bank {}", bank.id);

        self.status.show(Phase::Committed);
        self.status.show(Phase::Launching);
        Ok(())
    }

    pub fn image(&self) -> &[u8] {
        self.image.as_slice()
    }

    /// Bytes lost to framing errors in the last session.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn status(&self) -> &S {
        &self.status
    }

    pub fn log(&mut self) -> &mut Logger<W> {
        &mut self.log
    }
}

fn poll_state<L: Link>(link: &mut L) -> (UpdateState, bool) {
    link.with(|reception| {
        let session = reception.session();
        (session.state(), session.restart_requested())
    })
}
