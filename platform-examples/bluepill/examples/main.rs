#![deny(unsafe_code)]
#![allow(clippy::empty_loop)]
#![deny(warnings)]
#![no_std]
#![no_main]
extern crate cortex_m;
extern crate embedded_hal;
extern crate stm32f1xx_hal as hal;

use panic_halt as _;

use cortex_m_rt::entry;
use embedded_hal::blocking::spi::Transfer;
use hal::{pac, prelude::*};

use softspi::{BusyWait, Calibration, SoftSpi, MODE_3};

#[entry]
fn main() -> ! {
    // Get access to device peripherals and raw flash and rcc
    let dp = pac::Peripherals::take().unwrap();
    let mut flash = dp.FLASH.constrain();
    let rcc = dp.RCC.constrain();

    // Freeze clocks
    let _clocks = rcc.cfgr.freeze(&mut flash.acr);

    // Acquire the GPIO peripherals
    let mut gpiob = dp.GPIOB.split();

    let spi_sck  = gpiob.pb13.into_push_pull_output(&mut gpiob.crh);
    let spi_miso = gpiob.pb14.into_floating_input(&mut gpiob.crh);
    let spi_mosi = gpiob.pb15.into_push_pull_output(&mut gpiob.crh);
    let mut spi_cs = gpiob.pb12.into_push_pull_output(&mut gpiob.crh);

    // Loop rate of the busy wait on a 72 MHz Blue Pill, release profile.
    // Re-measure when the clock tree or the profile changes.
    let calibration = Calibration::new(12_000_000);

    let mut spi = SoftSpi::new_with_calibration(spi_sck, spi_mosi, spi_miso, BusyWait, calibration)
        .expect("Infallible cannot fail");
    spi.set_mode(MODE_3).expect("Infallible cannot fail");
    spi.set_frequency(50_000);

    // Read the JEDEC id of a SPI flash chip: one command byte out, three
    // id bytes in, exchanged over the same buffer.
    let mut frame = [0x9F, 0x00, 0x00, 0x00];

    spi_cs.set_low();
    spi.transfer(&mut frame).expect("Infallible cannot fail");
    spi_cs.set_high();

    loop {}
}
