//! # Software emulated SPI master
//!
//! Emulates an SPI bus master on three plain GPIO pins for hosts that have
//! no free hardware SPI peripheral, or whose SPI pins ended up on the wrong
//! side of the board. Clock, data out and data in are ordinary
//! `embedded_hal` digital pins; everything else, the four SPI modes, the
//! MSB-first byte framing and the clock timing, happens in software here.
//!
//! Typically you want to look into the following items:
//!  - [`SoftSpi::new`] to wire up the three pins
//!  - the blocking [`Transfer`](embedded_hal::blocking::spi::Transfer) impl
//!    to exchange a buffer in place, full duplex
//!  - [`SoftSpi::set_mode`], [`SoftSpi::set_frequency`] and
//!    [`SoftSpi::set_between_byte_delay_us`] to reconfigure a live master
//!  - [`Calibration`] to teach the busy-wait timing your host's actual
//!    loop rate, which you really should do before trusting any frequency
//!
//! Timing is approximated by busy-waiting, there is no hardware timer in
//! play. Read the [`delay`] module docs for the consequences. Chip select,
//! multiple slaves, DMA and interrupts are all out of scope; transfers run
//! synchronously on the calling thread until the buffer is done.
//!
//! On a Raspberry Pi style Linux host, the `rpi` feature adds the `rpi`
//! module which opens the three pins by BCM number and exposes the same
//! engine behind an `io::Result` surface.

#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod delay;
pub mod dummypins;
pub mod error;
pub mod mode;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod spi;

pub use crate::delay::{BusyWait, Calibration, NoWait, Wait};
pub use crate::error::Error;
pub use crate::spi::{SoftSpi, DEFAULT_BETWEEN_BYTE_DELAY_US, DEFAULT_FREQUENCY_HZ};

// The mode vocabulary is embedded_hal's; re-exported so callers don't need
// a direct embedded-hal dependency just to name a mode.
pub use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0, MODE_1, MODE_2, MODE_3};
