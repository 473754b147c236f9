//! Update session state shared between the SPI interrupt and the main loop
//!
//! Every field has exactly one writer on the fast path:
//! - `state`, `received`, `overruns` and `restart` are written by the
//!   reception context while events arrive,
//! - `pending` is set by the reception context and cleared by the main loop
//!   once the byte has been fetched,
//! - `received` is reset by the main loop only after the session is `Done`,
//!   when no further data events are counted.

use crate::protocol::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Receiving,
    Done,
}

/// What the reception context has to do after applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Restart,
}

#[derive(Debug)]
pub struct Session {
    state: UpdateState,
    pending: bool,
    received: u32,
    overruns: u32,
    restart: bool,
}

impl Session {
    pub const fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            pending: false,
            received: 0,
            overruns: 0,
            restart: false,
        }
    }

    /// Applies one event from the transport.
    ///
    /// `Start` only leaves `Idle` and `End` only leaves `Receiving`; repeated
    /// or out-of-order control messages do not disturb a session in progress.
    /// `Data` outside `Receiving` is ignored.
    pub fn apply(&mut self, event: Event) -> Dispatch {
        match event {
            Event::Reset => {
                self.restart = true;
                return Dispatch::Restart;
            }
            Event::Start => {
                if self.state == UpdateState::Idle {
                    self.state = UpdateState::Receiving;
                }
            }
            Event::Data => {
                if self.state == UpdateState::Receiving {
                    // At most one byte can be pending; a second one replaces it.
                    if self.pending {
                        self.overruns = self.overruns.wrapping_add(1);
                    }
                    self.pending = true;
                    self.received = self.received.wrapping_add(1);
                }
            }
            Event::End => {
                if self.state == UpdateState::Receiving {
                    self.state = UpdateState::Done;
                }
            }
        }
        Dispatch::Continue
    }

    /// Clears the pending indicator, returning whether a byte was waiting.
    pub fn take_pending(&mut self) -> bool {
        core::mem::replace(&mut self.pending, false)
    }

    /// Session cleanup after a commit.
    pub fn reset_received(&mut self) {
        self.received = 0;
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn received(&self) -> u32 {
        self.received
    }

    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    pub fn restart_requested(&self) -> bool {
        self.restart
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
