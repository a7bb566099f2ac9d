//! Pairwise ride durations between sites.
//!
//! [`RideDurations`] remembers which directed coordinate pairs have been
//! computed, works out the smallest request that covers every missing pair
//! and merges the answer of a [`RideDurationProvider`]. Entries are never
//! evicted; a key only changes when a later round trip recomputes it.

mod cache;
mod error;
mod key;
mod provider;

pub use cache::{
    MissingEndpoints, RefreshOutcome, RideDuration, RideDurations, RideDurationsSnapshot,
};
pub use error::{RefreshError, RideDurationError};
pub use key::{RideKey, RideKeyParseError};
pub use provider::{RideDurationMatrix, RideDurationProvider};
