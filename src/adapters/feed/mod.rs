//! Match Feed Adapter - Live Scores over HTTP
//!
//! Sub-modules:
//! - `client`: rate-limited reqwest client implementing `MatchFeed`
//! - `types`: match-details payload and its mapping to `MatchSnapshot`

pub mod client;
pub mod types;

pub use client::HttpMatchFeed;
