//! Host-side doubles for the bootloader's hardware seams

use std::collections::VecDeque;

use crate::bootloader::{BootController, Dispatch, Link, Reception};
use crate::config::MessageIds;
use crate::drivers::flash::{FlashAccess, FlashError};
use crate::drivers::status::{Led, Phase, StatusIndicator};
use embedded_hal::spi::FullDuplex;

/// SPI slave fed from a byte queue; `None` entries are receive errors.
#[derive(Debug, Default)]
pub struct FaultySpi {
    wire: VecDeque<Option<u8>>,
}

impl FaultySpi {
    pub fn new(wire: &[Option<u8>]) -> Self {
        Self {
            wire: wire.iter().copied().collect(),
        }
    }

    pub fn feed(&mut self, wire: &[Option<u8>]) {
        self.wire.extend(wire.iter().copied());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireError;

impl FullDuplex<u8> for FaultySpi {
    type Error = WireError;

    fn read(&mut self) -> nb::Result<u8, WireError> {
        match self.wire.pop_front() {
            Some(Some(byte)) => Ok(byte),
            Some(None) => Err(nb::Error::Other(WireError)),
            None => Err(nb::Error::WouldBlock),
        }
    }

    fn send(&mut self, _word: u8) -> nb::Result<(), WireError> {
        Ok(())
    }
}

/// Bytes that arrive over SPI between two main-loop polls, optionally
/// followed by the host deselecting the slave
#[derive(Debug, Clone, Default)]
pub struct Step {
    wire: Vec<Option<u8>>,
    deselect: bool,
}

impl Step {
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Raw wire content; `None` is a byte corrupted on the wire.
    pub fn wire(wire: &[Option<u8>]) -> Self {
        Step {
            wire: wire.to_vec(),
            deselect: false,
        }
    }

    pub fn frame(id: u8, payload: u8) -> Self {
        Self::wire(&[Some(id), Some(payload)])
    }

    pub fn start() -> Self {
        Self::frame(MessageIds::default().start, 0)
    }

    pub fn end() -> Self {
        Self::frame(MessageIds::default().end, 0)
    }

    pub fn reset() -> Self {
        Self::frame(MessageIds::default().reset, 0)
    }

    pub fn data(byte: u8) -> Self {
        Self::frame(MessageIds::default().data, byte)
    }

    /// Two data frames with no poll in between.
    pub fn burst(first: u8, second: u8) -> Self {
        Self::data(first).then(Self::data(second))
    }

    /// A data frame followed by a receive error before it is drained.
    pub fn corrupted(byte: u8) -> Self {
        Self::data(byte).then(Self::wire(&[None]))
    }

    /// Slave select released after the bytes of this step.
    pub fn deselected(mut self) -> Self {
        self.deselect = true;
        self
    }

    pub fn then(mut self, next: Step) -> Self {
        self.wire.extend(next.wire);
        self.deselect |= next.deselect;
        self
    }
}

/// Simulates the SPI interrupt: before every main-loop poll the next scripted
/// step is delivered byte by byte through the real transport and session.
pub struct ScriptedLink {
    reception: Reception<FaultySpi>,
    script: VecDeque<Step>,
    polls: usize,
    restarts: usize,
}

impl ScriptedLink {
    /// Routes are registered up front, as the firmware does before it
    /// enables the SPI interrupt.
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        let mut reception = Reception::new(FaultySpi::default(), 0);
        reception
            .register(&MessageIds::default())
            .expect("default ids are routable");
        Self {
            reception,
            script: script.into_iter().collect(),
            polls: 0,
            restarts: 0,
        }
    }

    pub fn reception(&self) -> &Reception<FaultySpi> {
        &self.reception
    }

    pub fn polls(&self) -> usize {
        self.polls
    }

    /// Reset messages the interrupt would have acted on.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Link for ScriptedLink {
    type Spi = FaultySpi;

    fn with<R>(&mut self, f: impl FnOnce(&mut Reception<FaultySpi>) -> R) -> R {
        self.polls += 1;
        if let Some(step) = self.script.pop_front() {
            self.reception.transport_mut().spi_mut().feed(&step.wire);
            for _ in 0..step.wire.len() {
                if self.reception.on_interrupt() == Dispatch::Restart {
                    self.restarts += 1;
                }
            }
            if step.deselect {
                self.reception.resync();
            }
        }
        f(&mut self.reception)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOp {
    Erase(u32),
    Program(u32, usize),
}

/// 128 KiB of NOR flash: erase sets bytes to 0xFF, programming can only
/// clear bits.
pub struct MemFlash {
    memory: Vec<u8>,
    ops: Vec<FlashOp>,
    fail_erase: Option<u32>,
    fail_program: Option<u32>,
}

impl MemFlash {
    pub const SIZE: usize = 0x2_0000;

    pub fn new() -> Self {
        Self {
            memory: vec![0xFF; Self::SIZE],
            ops: Vec::new(),
            fail_erase: None,
            fail_program: None,
        }
    }

    /// Presets a little-endian word without recording an operation.
    pub fn with_word(mut self, address: u32, word: u32) -> Self {
        let at = address as usize;
        self.memory[at..at + 4].copy_from_slice(&word.to_le_bytes());
        self
    }

    pub fn fail_erase_at(&mut self, address: u32) {
        self.fail_erase = Some(address);
    }

    pub fn fail_program_at(&mut self, address: u32) {
        self.fail_program = Some(address);
    }

    pub fn ops(&self) -> &[FlashOp] {
        &self.ops
    }

    pub fn contents(&self, address: u32, len: usize) -> &[u8] {
        &self.memory[address as usize..address as usize + len]
    }

    fn range(address: u32, len: usize) -> Option<core::ops::Range<usize>> {
        let start = address as usize;
        let end = start.checked_add(len)?;
        (end <= Self::SIZE).then_some(start..end)
    }
}

impl Default for MemFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashAccess for MemFlash {
    const SECTOR_SIZE: u32 = 256;

    fn erase_sector(&mut self, address: u32) -> Result<(), FlashError> {
        let base = address & !(Self::SECTOR_SIZE - 1);
        if self.fail_erase == Some(base) {
            return Err(FlashError::EraseFailed(base));
        }
        let range = Self::range(base, Self::SECTOR_SIZE as usize).ok_or(FlashError::OutOfRange(base))?;
        self.memory[range].fill(0xFF);
        self.ops.push(FlashOp::Erase(base));
        Ok(())
    }

    fn program(&mut self, address: u32, data: &[u8]) -> Result<(), FlashError> {
        if self.fail_program == Some(address) {
            return Err(FlashError::ProgramFailed(address));
        }
        let range = Self::range(address, data.len()).ok_or(FlashError::OutOfRange(address))?;
        for (cell, &byte) in self.memory[range].iter_mut().zip(data) {
            *cell &= byte;
        }
        self.ops.push(FlashOp::Program(address, data.len()));
        Ok(())
    }

    fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), FlashError> {
        let range = Self::range(address, buffer.len()).ok_or(FlashError::ReadFailed(address))?;
        buffer.copy_from_slice(&self.memory[range]);
        Ok(())
    }
}

/// Remembers LED states and every phase shown.
#[derive(Debug, Default)]
pub struct RecordingLeds {
    on: [bool; 3],
    phases: Vec<Phase>,
}

impl RecordingLeds {
    pub fn lit(&self) -> Vec<Led> {
        Led::ALL
            .into_iter()
            .zip(self.on)
            .filter_map(|(led, on)| on.then_some(led))
            .collect()
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }
}

impl StatusIndicator for RecordingLeds {
    fn set(&mut self, led: Led, on: bool) {
        self.on[led as usize] = on;
    }

    fn show(&mut self, phase: Phase) {
        self.phases.push(phase);
        for led in Led::ALL {
            self.set(led, phase.lit(led));
        }
    }
}

/// Records every call in order; terminal actions panic with the history so
/// tests can assert on it.
#[derive(Debug, Default)]
pub struct RecordingController {
    calls: Vec<String>,
}

impl BootController for RecordingController {
    fn quiesce(&mut self) {
        self.calls.push("quiesce".to_string());
    }

    fn select_vector_table(&mut self, address: u32) {
        self.calls.push(format!("select_vector_table({:#x})", address));
    }

    fn transfer_control(&mut self, address: u32) -> ! {
        panic!(
            "transfer_control({:#x}) after {}",
            address,
            self.calls.join(", ")
        )
    }

    fn restart(&mut self) -> ! {
        panic!("restart")
    }
}
