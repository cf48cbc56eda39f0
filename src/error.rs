//! Error type shared by the whole crate.
//!
//! There are only two ways this engine can fail: a caller asks for an SPI
//! mode that does not exist, or one of the underlying GPIO pins reports an
//! error. There is no transient-failure handling on purpose. This is a raw
//! electrical signaling layer with no checksums and no acknowledgments, so
//! either the configuration is wrong (caught at the setter) or the pin
//! backend is broken (caught when it happens).

/// Everything that can go wrong while driving the emulated bus.
///
/// `E` is the error type of the underlying pins. All three pins of a
/// [`SoftSpi`](crate::spi::SoftSpi) share one error type, which keeps this
/// enum to a single pin variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A mode number outside of 0..=3 was requested.
    ///
    /// The previously configured mode, clock polarity and clock pin level
    /// are left untouched when this is returned.
    UnsupportedMode(u8),
    /// `FullDuplex::read` was called but no exchanged byte is latched.
    ///
    /// Every `send` latches the byte it sampled; `read` takes it. Two
    /// `read`s in a row trip over this.
    NoData,
    /// An underlying pin operation failed.
    Pin(E),
}
