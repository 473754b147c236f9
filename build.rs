use std::env;

// Start of the 8 KiB boot section (BOOTSZ = 00), byte address.
const BOOT_SECTION_START: u32 = 0x1E000;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        // Host builds only carry the portable core and its tests.
        return;
    }

    println!("cargo:rustc-link-arg=-mmcu=atmega128");
    println!(
        "cargo:rustc-link-arg=-Wl,--section-start=.text={:#x}",
        BOOT_SECTION_START
    );

    println!(
        "cargo:warning=Building bootloader for ATmega128 at {:#x}",
        BOOT_SECTION_START
    );
}
