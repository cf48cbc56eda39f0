//! # Small module to provide "fake" pins
//!
//! Two kinds of fakes live here. The dummy pins accept writes and answer
//! reads without any hardware behind them, for when a slave has no data
//! output and the MISO argument still has to be filled in. The [`Wire`] is
//! an in-memory logic level that output and input handles share, which is
//! enough to simulate a shorted MOSI/MISO loop or to watch what the engine
//! does to the clock line without owning an oscilloscope.
//!
//! All pins in this module are infallible.

use core::cell::Cell;
use core::convert::Infallible;
use embedded_hal::digital::v2::{InputPin, OutputPin};

/// Provides a dummy OutputPin.
///
/// This is very usable if a function requires a GPIO pin but nothing needs
/// to see the signal, for example the MOSI line when only reading from a
/// slave that ignores its input.
#[derive(Debug, Clone, Copy)]
pub struct DummyOutputPin;

impl OutputPin for DummyOutputPin {
    type Error = Infallible;
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Provides a dummy InputPin that always reads low.
///
/// Use this as the MISO pin for write-only slaves. Plenty of chips never
/// drive data back, a small display being the usual example, and there is
/// no point in burning a real input pin on them.
#[derive(Debug, Clone, Copy)]
pub struct DummyInputPin;

impl InputPin for DummyInputPin {
    type Error = Infallible;
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(false)
    }
}

/// A wire with a logic level and no electronics attached.
///
/// Hand out any number of [`output`](Wire::output) and
/// [`input`](Wire::input) handles; they all see the same level. Wiring one
/// output and one input handle of the same `Wire` into MOSI and MISO gives
/// the loopback of a jumpered bus, and putting the clock on its own `Wire`
/// lets a test check the idle level after a mode change.
///
/// The level starts out low.
#[derive(Debug, Default)]
pub struct Wire {
    level: Cell<bool>,
}

impl Wire {
    /// A new wire, pulled low.
    pub fn new() -> Wire {
        Wire {
            level: Cell::new(false),
        }
    }

    /// An output handle driving this wire.
    pub fn output(&self) -> WireOutputPin<'_> {
        WireOutputPin { wire: self }
    }

    /// An input handle reading this wire.
    pub fn input(&self) -> WireInputPin<'_> {
        WireInputPin { wire: self }
    }

    /// The current level, true meaning high.
    pub fn level(&self) -> bool {
        self.level.get()
    }

    /// Forces the level, as an external device driving the wire would.
    pub fn set_level(&self, high: bool) {
        self.level.set(high)
    }
}

/// OutputPin handle of a [`Wire`].
#[derive(Debug, Clone, Copy)]
pub struct WireOutputPin<'a> {
    wire: &'a Wire,
}

impl OutputPin for WireOutputPin<'_> {
    type Error = Infallible;
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.wire.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.wire.level.set(true);
        Ok(())
    }
}

/// InputPin handle of a [`Wire`].
#[derive(Debug, Clone, Copy)]
pub struct WireInputPin<'a> {
    wire: &'a Wire,
}

impl InputPin for WireInputPin<'_> {
    type Error = Infallible;
    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.wire.level.get())
    }

    fn is_high(&self) -> Result<bool, Self::Error> {
        Ok(self.wire.level.get())
    }
}
