//! "Bit bang" full duplex SPI master implementation.
//!
//! Use when you don't want to sacrifice a hardware SPI port, or your board
//! simply doesn't have one left. Three plain GPIOs stand in for SCK, MOSI
//! and MISO; chip select is not handled here and stays under the caller's
//! control, so assert it around whatever transfer you run.
//!
//! The engine speaks all four SPI modes. The mode decides two things: the
//! level the clock rests at between transfers (CPOL) and which clock edge
//! latches data (CPHA). Changing the mode retargets the clock's idle level
//! right away, because a caller may assert chip select before the first
//! transfer and the slave must already see the correct idle level at that
//! point.
//!
//! Bytes go out most significant bit first, and every byte clocked out is a
//! byte clocked in. The blocking [`Transfer`] impl is the natural surface
//! for that: it exchanges a buffer in place. [`Write`] discards the read
//! half, and [`FullDuplex`] does one byte per `send`/`read` pair for code
//! written against the non-blocking trait.
//!
//! Timing comes from a [`Wait`] and a [`Calibration`], see the
//! [`delay`](crate::delay) module for what that approximation is worth.

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::spi::{FullDuplex, Mode, Phase, Polarity, MODE_0};

use crate::delay::{Calibration, Wait};
use crate::error::Error;
use crate::mode;

/// Clock rate applied at construction time, in Hz.
///
/// Conservative on purpose. Most slaves accept far more, call
/// [`SoftSpi::set_frequency`] once you know what yours tolerates.
pub const DEFAULT_FREQUENCY_HZ: u32 = 100_000;

/// Pause inserted after every transferred byte at construction time, in
/// microseconds. No gap by default.
pub const DEFAULT_BETWEEN_BYTE_DELAY_US: u32 = 0;

/// Software SPI master on three GPIO pins.
///
/// `SCK` and `MOSI` are outputs, `MISO` is an input, and all three must
/// agree on one pin error type. `W` is the busy-wait primitive. The pins
/// are owned exclusively for the lifetime of the master and come back out
/// of [`free`](SoftSpi::free).
///
/// Construction applies mode 0, [`DEFAULT_FREQUENCY_HZ`] and
/// [`DEFAULT_BETWEEN_BYTE_DELAY_US`], each of which can be changed at any
/// time afterwards. Don't reconfigure from another thread while a transfer
/// is running; there is no locking in here and the resulting waveform would
/// be anyone's guess.
pub struct SoftSpi<SCK, MOSI, MISO, W>
where
    SCK: OutputPin,
    MOSI: OutputPin,
    MISO: InputPin,
    W: Wait,
{
    sck: SCK,
    mosi: MOSI,
    miso: MISO,
    wait: W,
    calibration: Calibration,
    mode: Mode,
    half_period_loops: u32,
    byte_gap_loops: u32,
    latched: Option<u8>,
}

impl<SCK, MOSI, MISO, W, E> SoftSpi<SCK, MOSI, MISO, W>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    W: Wait,
{
    /// Constructs a soft SPI master with the default calibration.
    ///
    /// Only use this to get going. The default loop rate is a guess, see
    /// [`new_with_calibration`](SoftSpi::new_with_calibration).
    pub fn new(sck: SCK, mosi: MOSI, miso: MISO, wait: W) -> Result<Self, Error<E>> {
        Self::new_with_calibration(sck, mosi, miso, wait, Calibration::default())
    }

    /// Constructs a soft SPI master with a measured calibration.
    ///
    /// Drives the clock to the mode 0 idle level before returning, so a
    /// slave whose chip select is asserted right after this call already
    /// sees a well-formed bus.
    pub fn new_with_calibration(
        sck: SCK,
        mosi: MOSI,
        miso: MISO,
        wait: W,
        calibration: Calibration,
    ) -> Result<Self, Error<E>> {
        let mut spi = SoftSpi {
            sck,
            mosi,
            miso,
            wait,
            calibration,
            mode: MODE_0,
            half_period_loops: calibration.half_period_loops(DEFAULT_FREQUENCY_HZ),
            byte_gap_loops: calibration.byte_gap_loops(DEFAULT_BETWEEN_BYTE_DELAY_US),
            latched: None,
        };
        spi.drive_sck_idle()?;
        Ok(spi)
    }

    /// Reconfigures the SPI mode.
    ///
    /// The clock pin is driven to the new idle level immediately, not at
    /// the start of the next transfer. CS may be asserted in between.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error<E>> {
        self.mode = mode;
        self.drive_sck_idle()
    }

    /// Reconfigures the SPI mode from its number, 0 through 3.
    ///
    /// Any other number fails with [`Error::UnsupportedMode`] and leaves
    /// the configured mode, polarity and clock level as they were.
    pub fn set_mode_number(&mut self, mode: u8) -> Result<(), Error<E>> {
        self.set_mode(mode::from_number(mode)?)
    }

    /// The currently configured mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Retargets the clock rate.
    ///
    /// Takes effect with the next bit. The produced rate is the busy-wait
    /// approximation described in [`delay`](crate::delay), clamped so the
    /// clock pulse never collapses to zero width.
    pub fn set_frequency(&mut self, hz: u32) {
        self.half_period_loops = self.calibration.half_period_loops(hz);
    }

    /// Sets the pause inserted after every transferred byte, including the
    /// last one of a transfer. Zero means no pause.
    pub fn set_between_byte_delay_us(&mut self, us: u32) {
        self.byte_gap_loops = self.calibration.byte_gap_loops(us);
    }

    /// Releases the pins and the wait primitive.
    pub fn free(self) -> (SCK, MOSI, MISO, W) {
        (self.sck, self.mosi, self.miso, self.wait)
    }

    /// Exchanges one byte, most significant bit first.
    ///
    /// Clocks out `byte` and returns the eight bits sampled from MISO in
    /// the same order. The inter-byte gap is not applied here; the
    /// buffer-level operations own that.
    pub fn exchange_byte(&mut self, byte: u8) -> Result<u8, Error<E>> {
        let mut out = byte;
        let mut result = 0u8;
        for _ in 0..8 {
            let bit = (out & 0x80) == 0x80;
            out <<= 1;
            result <<= 1;
            if self.exchange_bit(bit)? {
                result |= 1;
            }
        }
        Ok(result)
    }

    fn exchange_bit(&mut self, out: bool) -> Result<bool, Error<E>> {
        match self.mode.phase {
            // CPHA = 0: the data bit is on the wire before the leading
            // edge. MISO is sampled just ahead of that edge, matching the
            // waveform this engine has always produced.
            Phase::CaptureOnFirstTransition => {
                self.write_mosi(out)?;
                self.wait.wait(self.half_period_loops);
                let bit = self.miso.is_high().map_err(Error::Pin)?;
                self.drive_sck_active()?;
                self.wait.wait(self.half_period_loops);
                self.drive_sck_idle()?;
                Ok(bit)
            }
            // CPHA = 1: data changes on the leading edge, the trailing
            // edge latches it, so MISO is sampled right after that edge.
            Phase::CaptureOnSecondTransition => {
                self.drive_sck_active()?;
                self.write_mosi(out)?;
                self.wait.wait(self.half_period_loops);
                self.drive_sck_idle()?;
                let bit = self.miso.is_high().map_err(Error::Pin)?;
                self.wait.wait(self.half_period_loops);
                Ok(bit)
            }
        }
    }

    fn write_mosi(&mut self, high: bool) -> Result<(), Error<E>> {
        if high {
            self.mosi.set_high()
        } else {
            self.mosi.set_low()
        }
        .map_err(Error::Pin)
    }

    fn drive_sck_idle(&mut self) -> Result<(), Error<E>> {
        match self.mode.polarity {
            Polarity::IdleLow => self.sck.set_low(),
            Polarity::IdleHigh => self.sck.set_high(),
        }
        .map_err(Error::Pin)
    }

    fn drive_sck_active(&mut self) -> Result<(), Error<E>> {
        match self.mode.polarity {
            Polarity::IdleLow => self.sck.set_high(),
            Polarity::IdleHigh => self.sck.set_low(),
        }
        .map_err(Error::Pin)
    }
}

impl<SCK, MOSI, MISO, W, E> Transfer<u8> for SoftSpi<SCK, MOSI, MISO, W>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    W: Wait,
{
    type Error = Error<E>;

    /// Full duplex exchange of the whole buffer, in place.
    ///
    /// Each position is overwritten with the byte sampled during that
    /// position's own exchange, and the inter-byte gap runs after every
    /// byte, the last one included.
    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        for word in words.iter_mut() {
            *word = self.exchange_byte(*word)?;
            self.wait.wait(self.byte_gap_loops);
        }
        Ok(words)
    }
}

impl<SCK, MOSI, MISO, W, E> Write<u8> for SoftSpi<SCK, MOSI, MISO, W>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    W: Wait,
{
    type Error = Error<E>;

    /// Same clocking as a transfer, with the sampled bytes thrown away.
    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for word in words {
            self.exchange_byte(*word)?;
            self.wait.wait(self.byte_gap_loops);
        }
        Ok(())
    }
}

impl<SCK, MOSI, MISO, W, E> FullDuplex<u8> for SoftSpi<SCK, MOSI, MISO, W>
where
    SCK: OutputPin<Error = E>,
    MOSI: OutputPin<Error = E>,
    MISO: InputPin<Error = E>,
    W: Wait,
{
    type Error = Error<E>;

    /// Exchanges one byte and latches the sampled one for `read`.
    ///
    /// Never actually blocks; the busy wait happens inside. A second `send`
    /// before a `read` overwrites the latch.
    fn send(&mut self, byte: u8) -> nb::Result<(), Self::Error> {
        let read = self.exchange_byte(byte).map_err(nb::Error::Other)?;
        self.wait.wait(self.byte_gap_loops);
        self.latched = Some(read);
        Ok(())
    }

    /// Takes the byte latched by the previous `send`.
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        match self.latched.take() {
            Some(byte) => Ok(byte),
            None => Err(nb::Error::Other(Error::NoData)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::NoWait;
    use crate::dummypins::{DummyInputPin, DummyOutputPin, Wire};
    use core::cell::RefCell;
    use embedded_hal::spi::{MODE_1, MODE_2, MODE_3};
    use embedded_hal_mock::pin::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use std::vec;
    use std::vec::Vec;

    const ALL_MODES: [Mode; 4] = [MODE_0, MODE_1, MODE_2, MODE_3];

    /// A master wired to itself: MOSI and MISO share one wire, the clock
    /// hangs on another so its level stays observable.
    fn loopback<'a>(
        data: &'a Wire,
        sck: &'a Wire,
    ) -> SoftSpi<
        crate::dummypins::WireOutputPin<'a>,
        crate::dummypins::WireOutputPin<'a>,
        crate::dummypins::WireInputPin<'a>,
        NoWait,
    > {
        SoftSpi::new(sck.output(), data.output(), data.input(), NoWait).unwrap()
    }

    #[test]
    fn test_loopback_returns_every_byte_in_every_mode() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);
        for mode in ALL_MODES.iter().copied() {
            spi.set_mode(mode).unwrap();
            for byte in 0..=255u8 {
                assert_eq!(
                    spi.exchange_byte(byte),
                    Ok(byte),
                    "mode {}",
                    mode::to_number(mode)
                );
            }
        }
    }

    #[test]
    fn test_transfer_exchanges_in_place() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);
        let mut buffer = [0xA5u8, 0x00, 0xFF, 0x5A];
        let echoed = spi.transfer(&mut buffer).unwrap().to_vec();
        assert_eq!(echoed, [0xA5, 0x00, 0xFF, 0x5A]);
        assert_eq!(buffer, [0xA5, 0x00, 0xFF, 0x5A]);
    }

    #[test]
    fn test_transfer_single_a5_mode_0() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);
        let mut buffer = [0xA5u8];
        spi.transfer(&mut buffer).unwrap();
        assert_eq!(buffer, [0xA5]);
    }

    #[test]
    fn test_transfer_overwrites_with_sampled_bytes() {
        // MISO tied low: whatever goes out, all zeros come back.
        let mut spi =
            SoftSpi::new(DummyOutputPin, DummyOutputPin, DummyInputPin, NoWait).unwrap();
        let mut buffer = [0xFFu8, 0xA5, 0x01];
        spi.transfer(&mut buffer).unwrap();
        assert_eq!(buffer, [0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_construction_drives_clock_to_mode_0_idle() {
        let data = Wire::new();
        let sck = Wire::new();
        sck.set_level(true);
        let _spi = loopback(&data, &sck);
        assert!(!sck.level());
    }

    #[test]
    fn test_set_mode_retargets_idle_level_immediately() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);

        spi.set_mode(MODE_2).unwrap();
        assert!(sck.level(), "CPOL = 1 idles high");
        spi.set_mode(MODE_1).unwrap();
        assert!(!sck.level(), "CPOL = 0 idles low");
        spi.set_mode(MODE_3).unwrap();
        assert!(sck.level());
    }

    #[test]
    fn test_unsupported_mode_number_changes_nothing() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);

        spi.set_mode_number(3).unwrap();
        assert!(sck.level());

        assert_eq!(spi.set_mode_number(4), Err(Error::UnsupportedMode(4)));
        assert!(spi.mode() == MODE_3);
        assert!(sck.level(), "a rejected mode must not touch the clock");
    }

    #[test]
    fn test_transfer_waits_one_gap_per_byte() {
        let data = Wire::new();
        let sck = Wire::new();
        let log = RefCell::new(Vec::new());
        let recorder = |loops: u32| log.borrow_mut().push(loops);

        let mut spi = SoftSpi::new_with_calibration(
            sck.output(),
            data.output(),
            data.input(),
            recorder,
            Calibration::new(1_000_000),
        )
        .unwrap();
        spi.set_frequency(50_000); // half period: 10 loops
        spi.set_between_byte_delay_us(7); // gap: 7 loops

        let mut buffer = [0x12u8, 0x34, 0x56];
        spi.transfer(&mut buffer).unwrap();
        drop(spi);

        let log = log.into_inner();
        // Per byte: 8 bits of 2 half periods each, then exactly one gap,
        // including after the final byte.
        assert_eq!(log.len(), 3 * 17);
        for (i, loops) in log.iter().copied().enumerate() {
            if i % 17 == 16 {
                assert_eq!(loops, 7, "gap wait at position {}", i);
            } else {
                assert_eq!(loops, 10, "half period wait at position {}", i);
            }
        }
    }

    #[test]
    fn test_zero_gap_is_still_issued() {
        let data = Wire::new();
        let sck = Wire::new();
        let log = RefCell::new(Vec::new());
        let recorder = |loops: u32| log.borrow_mut().push(loops);

        let mut spi = SoftSpi::new_with_calibration(
            sck.output(),
            data.output(),
            data.input(),
            recorder,
            Calibration::new(1_000_000),
        )
        .unwrap();

        let mut buffer = [0xEEu8];
        spi.transfer(&mut buffer).unwrap();
        drop(spi);

        let log = log.into_inner();
        assert_eq!(log.len(), 17);
        assert_eq!(log[16], 0);
    }

    #[test]
    fn test_full_duplex_latches_one_byte() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);

        nb::block!(spi.send(0xC3)).unwrap();
        assert_eq!(nb::block!(FullDuplex::read(&mut spi)), Ok(0xC3));
        match FullDuplex::read(&mut spi) {
            Err(nb::Error::Other(Error::NoData)) => {}
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[test]
    fn test_write_discards_the_read_half() {
        let data = Wire::new();
        let sck = Wire::new();
        let mut spi = loopback(&data, &sck);
        spi.write(&[0x01, 0x80, 0xFF]).unwrap();
        // The data wire ends at the last bit written out.
        assert!(data.level());
        spi.write(&[0xFE]).unwrap();
        assert!(!data.level());
    }

    #[test]
    fn test_mode_0_waveform_order() {
        // Byte 0xA5 = 1010 0101. CPHA = 0: MOSI settles, MISO is sampled,
        // then the clock pulses active and back to idle.
        let bits = [true, false, true, false, false, true, false, true];

        let mosi_tx: Vec<PinTransaction> = bits
            .iter()
            .map(|bit| {
                PinTransaction::set(if *bit { PinState::High } else { PinState::Low })
            })
            .collect();

        let mut sck_tx = vec![PinTransaction::set(PinState::Low)]; // construction
        for _ in 0..8 {
            sck_tx.push(PinTransaction::set(PinState::High));
            sck_tx.push(PinTransaction::set(PinState::Low));
        }

        // Feed back 0x5A = 0101 1010 on MISO.
        let miso_tx: Vec<PinTransaction> = [false, true, false, true, true, false, true, false]
            .iter()
            .map(|bit| {
                PinTransaction::get(if *bit { PinState::High } else { PinState::Low })
            })
            .collect();

        let sck = PinMock::new(&sck_tx);
        let mosi = PinMock::new(&mosi_tx);
        let miso = PinMock::new(&miso_tx);

        let mut spi = SoftSpi::new(sck, mosi, miso, NoWait).unwrap();
        assert_eq!(spi.exchange_byte(0xA5).unwrap(), 0x5A);

        let (mut sck, mut mosi, mut miso, _) = spi.free();
        sck.done();
        mosi.done();
        miso.done();
    }

    #[test]
    fn test_mode_3_waveform_order() {
        // CPHA = 1 with CPOL = 1: leading edge drives the clock low, MOSI
        // changes on it, the trailing edge back to high latches MISO.
        let bits = [false, true, true, true, false, false, false, true]; // 0x71

        let mosi_tx: Vec<PinTransaction> = bits
            .iter()
            .map(|bit| {
                PinTransaction::set(if *bit { PinState::High } else { PinState::Low })
            })
            .collect();

        let mut sck_tx = vec![
            PinTransaction::set(PinState::Low),  // construction, mode 0
            PinTransaction::set(PinState::High), // set_mode(MODE_3)
        ];
        for _ in 0..8 {
            sck_tx.push(PinTransaction::set(PinState::Low));
            sck_tx.push(PinTransaction::set(PinState::High));
        }

        let miso_tx: Vec<PinTransaction> =
            (0..8).map(|_| PinTransaction::get(PinState::Low)).collect();

        let sck = PinMock::new(&sck_tx);
        let mosi = PinMock::new(&mosi_tx);
        let miso = PinMock::new(&miso_tx);

        let mut spi = SoftSpi::new(sck, mosi, miso, NoWait).unwrap();
        spi.set_mode(MODE_3).unwrap();
        assert_eq!(spi.exchange_byte(0x71).unwrap(), 0x00);

        let (mut sck, mut mosi, mut miso, _) = spi.free();
        sck.done();
        mosi.done();
        miso.done();
    }
}
