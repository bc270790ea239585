//! # Matchday Sports
//!
//! Upstream clients and the cache-backed services built on them.
//!
//! - [`SportsClient`]: RapidAPI-style sports-data API (fixtures, standings, leagues)
//! - [`ContentClient`]: first-party content backend (news posts)
//! - [`SportsService`] / [`NewsService`]: read through a shared
//!   [`TtlCache`](matchday_cache::TtlCache) with per-resource TTLs

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod content;
mod http;
pub mod policy;
mod service;
mod sports;

pub use content::{ContentClient, ContentConfig, API_SUCCESS};
pub use service::{Cached, NewsService, SportsService};
pub use sports::{SportsClient, SportsConfig, DEFAULT_SPORTS_API_URL};
