//! # Matchday Core
//!
//! Shared building blocks for the Matchday crates:
//!
//! - **Errors**: [`MatchdayError`] and the cloneable [`FetchError`]
//! - **Clock**: [`Clock`] with a real and a manually advanced implementation
//! - **Keys**: cache-key conventions for every cached resource
//! - **Constants**: per-resource TTLs and upstream defaults
//! - **Traits**: upstream sources consumed by the services
//!
//! ## Example
//!
//! ```rust
//! use matchday_core::keys;
//!
//! assert_eq!(keys::standings("39", "2022"), "standings-39-2022");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod keys;
pub mod traits;

pub use clock::{Clock, MockClock, SystemClock};
pub use constants::*;
pub use error::{FetchError, MatchdayError, Result, SharedError};
pub use traits::*;
