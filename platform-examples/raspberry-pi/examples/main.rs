//! Loopback demo for a Raspberry Pi.
//!
//! Jumper BCM 10 (MOSI) straight to BCM 9 (MISO) and leave BCM 11 (SCK)
//! dangling or on a scope. Every byte sent must come back unchanged.

use softspi::rpi::{Pinout, RpiSoftSpi};

fn main() -> std::io::Result<()> {
    let mut spi = RpiSoftSpi::open(Pinout { sck: 11, mosi: 10, miso: 9 })?;
    spi.set_mode(0)?;
    spi.set_frequency(50_000);
    spi.set_between_byte_delay_us(10);

    let sent = [0xA5u8, 0x5A, 0xFF, 0x00];
    let mut buffer = sent;
    spi.transfer(&mut buffer)?;

    println!("sent {:02x?}, read back {:02x?}", sent, buffer);
    if buffer == sent {
        println!("loopback ok");
    } else {
        println!("loopback mismatch, check the jumper");
    }
    Ok(())
}
