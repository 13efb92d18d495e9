//! Unified error type for pcratch-iot.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the protocol core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Inbound commands
    /// Command frame with no bytes at all.
    EmptyCommand,

    /// Command frame shorter than its id requires.
    MalformedCommand { command_id: u8, len: usize },

    /// Command id not present in the command table.
    UnknownCommand(u8),

    /// Text payload is not valid UTF-8.
    InvalidUtf8,

    /// Tone command carried a zero period (frequency would be infinite).
    InvalidTonePeriod,

    // Link
    /// Operation needs a live connection and there is none.
    NotConnected,

    /// The GATT stack returned an error.
    Link(LinkError),

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

/// Subset of GATT/GAP errors we propagate (keeps the enum `Copy`-friendly).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Raw error code from the BLE stack.
    Raw(u32),
    /// Advertising could not start or no central was accepted.
    AdvertiseFailed,
    /// Local characteristic value could not be updated.
    WriteFailed,
    /// Notification could not be queued.
    NotifyFailed,
    /// The service table has not been registered yet.
    NotRegistered,
}

// Convenience conversions

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Error::Link(e)
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(_: core::str::Utf8Error) -> Self {
        Error::InvalidUtf8
    }
}
