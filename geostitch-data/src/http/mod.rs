//! Outbound HTTP plumbing shared by every connector.
//!
//! [`ResilientClient`] executes one logical request with bounded retries and
//! maps every failure onto [`geostitch_core::ConnectorError`].
//! [`RateLimiter`] spaces calls to services that publish a requests-per-second
//! ceiling.

mod client;
mod rate_limit;

pub use client::{
    ClientBuildError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig, OutboundRequest,
    ResilientClient, RetryPolicy,
};
pub use rate_limit::{RateLimitError, RateLimiter};
