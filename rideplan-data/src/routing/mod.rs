//! HTTP ride duration provider.
//!
//! [`HttpRideDurationProvider`] implements
//! [`rideplan_core::RideDurationProvider`] against a JSON service that
//! answers one origins-by-destinations matrix per request.
//!
//! # Example
//!
//! ```no_run
//! use rideplan_data::routing::HttpRideDurationProvider;
//!
//! let provider = HttpRideDurationProvider::new("http://localhost:8080")?;
//! assert_eq!(
//!     provider.endpoint().as_str(),
//!     "http://localhost:8080/api/ride-durations"
//! );
//! # Ok::<(), rideplan_data::routing::ProviderBuildError>(())
//! ```

mod provider;
mod wire;

pub use provider::{
    DEFAULT_PATH, DEFAULT_USER_AGENT, HttpRideDurationProvider, HttpRideDurationProviderConfig,
    ProviderBuildError,
};
