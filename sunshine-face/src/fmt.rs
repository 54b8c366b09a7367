//! Logging macros
//!
//! Forwards to `log` or `defmt` depending on the enabled feature and
//! compiles to nothing when neither is enabled.

#![allow(unused_macros, unused_imports)]

#[cfg(feature = "log")]
pub(crate) use log::{debug, info, trace, warn};

#[cfg(all(feature = "defmt", not(feature = "log")))]
pub(crate) use defmt::{debug, info, trace, warn};

// Still type-checks the arguments so they count as used
#[cfg(not(any(feature = "log", feature = "defmt")))]
macro_rules! discard {
    ($($arg:tt)*) => {{
        let _ = ::core::format_args!($($arg)*);
    }};
}

#[cfg(not(any(feature = "log", feature = "defmt")))]
pub(crate) use {discard as debug, discard as info, discard as trace, discard as warn};
