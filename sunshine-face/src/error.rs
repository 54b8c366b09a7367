//! Error types
//!
//! None of these are fatal: the face keeps drawing the last known state.

use thiserror::Error;

/// Failure to reach the paired handheld's data layer
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// No handheld is connected
    #[error("no paired device connected")]
    NoPeer,
}

/// A data item that could not be decoded at all
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Not valid JSON, or not shaped like `{"path": ..., "data": {...}}`
    #[error("malformed data item")]
    Malformed,
    /// Larger than the transport allows
    #[error("data item too large")]
    TooLarge,
}

/// Rejected time input
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// UTC offset outside of ±24h
    #[error("utc offset out of range")]
    OffsetOutOfRange,
    /// Date or time fields do not form a valid timestamp
    #[error("invalid date or time")]
    InvalidTime,
}
