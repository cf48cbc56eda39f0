//! Numbered SPI mode handling.
//!
//! Datasheets and host programs spell SPI modes as the numbers 0 to 3,
//! `embedded_hal` spells them as a [`Mode`] made of clock polarity (CPOL)
//! and clock phase (CPHA). The two functions here translate between the
//! spellings:
//!
//! | number | CPOL | CPHA | `embedded_hal` |
//! |--------|------|------|----------------|
//! | 0      | 0    | 0    | [`MODE_0`]     |
//! | 1      | 0    | 1    | [`MODE_1`]     |
//! | 2      | 1    | 0    | [`MODE_2`]     |
//! | 3      | 1    | 1    | [`MODE_3`]     |
//!
//! Anything outside of 0..=3 is rejected up front. Letting a bogus mode
//! reach the bit exchange would produce an undefined waveform, so the lookup
//! is the single place where mode numbers are validated.

use embedded_hal::spi::{Mode, Phase, Polarity, MODE_0, MODE_1, MODE_2, MODE_3};

use crate::error::Error;

/// Looks up a numbered SPI mode.
///
/// Fails with [`Error::UnsupportedMode`] for any number outside of 0..=3.
pub fn from_number<E>(mode: u8) -> Result<Mode, Error<E>> {
    match mode {
        0 => Ok(MODE_0),
        1 => Ok(MODE_1),
        2 => Ok(MODE_2),
        3 => Ok(MODE_3),
        n => Err(Error::UnsupportedMode(n)),
    }
}

/// The numeric spelling of `mode`.
pub fn to_number(mode: Mode) -> u8 {
    match (mode.polarity, mode.phase) {
        (Polarity::IdleLow, Phase::CaptureOnFirstTransition) => 0,
        (Polarity::IdleLow, Phase::CaptureOnSecondTransition) => 1,
        (Polarity::IdleHigh, Phase::CaptureOnFirstTransition) => 2,
        (Polarity::IdleHigh, Phase::CaptureOnSecondTransition) => 3,
    }
}
