//! SPI-driven second-stage bootloader for the ATmega128
//!
//! Everything outside [`hal`] is target independent and runs on the host
//! under `cargo test`.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch, abi_avr_interrupt))]

pub mod bootloader;
pub mod config;
pub mod drivers;
pub mod logger;
pub mod protocol;

#[cfg(target_arch = "avr")]
pub mod hal;

#[cfg(test)]
mod testing;
