//! Raspberry Pi backend: the same engine on pins opened by number.
//!
//! This is the glue for Linux hosts in the Raspberry Pi family. It claims
//! three GPIOs by BCM number through rppal, points them in the right
//! directions, and wraps the [`SoftSpi`] engine behind an `io::Result`
//! surface with numbered SPI modes, which is how host programs tend to
//! talk about the bus. Dropping the device releases the pins; rppal
//! restores their previous state on drop.
//!
//! rppal reads and writes pin levels infallibly once a pin is claimed, so
//! every error here is either a claim failure at open time or a rejected
//! configuration value.

use core::convert::Infallible;

use embedded_hal::blocking::spi::Transfer;
use embedded_hal::digital::v2::{InputPin, OutputPin};
use rppal::gpio::{self, Gpio};
use std::format;
use std::io;
use std::string::ToString;

use crate::delay::{BusyWait, Calibration};
use crate::error::Error;
use crate::spi::SoftSpi;

/// Converts a `gpio::Error` to an `io::Error`.
fn gpio_error_to_io_error(e: gpio::Error) -> io::Error {
    match e {
        gpio::Error::Io(e) => e,
        gpio::Error::PermissionDenied(path) => io::Error::new(
            io::ErrorKind::PermissionDenied,
            format!("Cannot open {}: permission denied", path),
        ),
        gpio::Error::PinNotAvailable(pin) => {
            io::Error::new(io::ErrorKind::InvalidInput, format!("Unknown pin number {}", pin))
        }
        e => io::Error::other(e.to_string()),
    }
}

/// Converts an engine error to an `io::Error`.
///
/// The pin arm is uninhabited because rppal pins cannot fail, so this only
/// ever translates configuration mistakes.
fn spi_error_to_io_error(e: Error<Infallible>) -> io::Error {
    match e {
        Error::UnsupportedMode(mode) => io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Unsupported SPI mode {}", mode),
        ),
        Error::NoData => io::Error::new(io::ErrorKind::WouldBlock, "No exchanged byte latched"),
        Error::Pin(e) => match e {},
    }
}

/// Which BCM pin numbers carry the three SPI lines.
///
/// The three numbers must be pairwise distinct. One device owns its pins
/// exclusively; opening a second device on any of the same numbers fails
/// at claim time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pinout {
    /// Clock output.
    pub sck: u8,
    /// Master out, slave in.
    pub mosi: u8,
    /// Master in, slave out.
    pub miso: u8,
}

impl Pinout {
    fn validate(&self) -> io::Result<()> {
        if self.sck == self.mosi || self.sck == self.miso || self.mosi == self.miso {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Pin numbers must be distinct, got SCK={} MOSI={} MISO={}",
                    self.sck, self.mosi, self.miso
                ),
            ));
        }
        Ok(())
    }
}

/// An rppal output pin speaking `embedded_hal`.
pub struct RpiOutputPin(gpio::OutputPin);

impl OutputPin for RpiOutputPin {
    type Error = Infallible;
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set_high();
        Ok(())
    }
}

/// An rppal input pin speaking `embedded_hal`.
pub struct RpiInputPin(gpio::InputPin);

impl InputPin for RpiInputPin {
    type Error = Infallible;
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.0.is_low())
    }

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.0.is_high())
    }
}

/// Emulated SPI master on Raspberry Pi GPIOs.
///
/// Opened once with a [`Pinout`], reconfigured through the setters at any
/// time, and torn down by dropping it. All transfers block the calling
/// thread until the whole buffer is exchanged.
pub struct RpiSoftSpi {
    spi: SoftSpi<RpiOutputPin, RpiOutputPin, RpiInputPin, BusyWait>,
}

impl RpiSoftSpi {
    /// Opens the three pins with the default busy-wait calibration.
    ///
    /// Fine for bring-up; measure your host and use
    /// [`open_with_calibration`](RpiSoftSpi::open_with_calibration) before
    /// relying on the clock rate.
    pub fn open(pinout: Pinout) -> io::Result<RpiSoftSpi> {
        Self::open_with_calibration(pinout, Calibration::default())
    }

    /// Opens the three pins with a measured busy-wait calibration.
    ///
    /// Fails if the numbers are not distinct or any pin cannot be claimed.
    /// A device that failed to open holds no pins.
    pub fn open_with_calibration(pinout: Pinout, calibration: Calibration) -> io::Result<RpiSoftSpi> {
        pinout.validate()?;
        let chip = Gpio::new().map_err(gpio_error_to_io_error)?;
        let sck = RpiOutputPin(chip.get(pinout.sck).map_err(gpio_error_to_io_error)?.into_output());
        let mosi = RpiOutputPin(chip.get(pinout.mosi).map_err(gpio_error_to_io_error)?.into_output());
        let miso = RpiInputPin(chip.get(pinout.miso).map_err(gpio_error_to_io_error)?.into_input());

        let spi = SoftSpi::new_with_calibration(sck, mosi, miso, BusyWait, calibration)
            .map_err(spi_error_to_io_error)?;
        Ok(RpiSoftSpi { spi })
    }

    /// Full duplex exchange of `buffer` in place.
    ///
    /// Every byte is overwritten with the byte sampled during its own
    /// exchange, and the configured inter-byte pause runs after each one,
    /// the last included.
    pub fn transfer(&mut self, buffer: &mut [u8]) -> io::Result<()> {
        Transfer::transfer(&mut self.spi, buffer).map_err(spi_error_to_io_error)?;
        Ok(())
    }

    /// Retargets the SPI clock rate in Hz.
    pub fn set_frequency(&mut self, hz: u32) {
        self.spi.set_frequency(hz)
    }

    /// Selects the SPI mode by number, 0 through 3.
    ///
    /// The clock line moves to the mode's idle level before this returns.
    /// Any other number is rejected and the previous configuration stays
    /// in force.
    pub fn set_mode(&mut self, mode: u8) -> io::Result<()> {
        self.spi.set_mode_number(mode).map_err(spi_error_to_io_error)
    }

    /// Sets the pause after every transferred byte, in microseconds.
    pub fn set_between_byte_delay_us(&mut self, us: u32) {
        self.spi.set_between_byte_delay_us(us)
    }
}
