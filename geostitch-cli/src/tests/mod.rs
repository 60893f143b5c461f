//! Shared test harness modules for the geostitch CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]
#![expect(clippy::expect_used, reason = "tests should fail fast when setup breaks")]
#![expect(clippy::float_arithmetic, reason = "tolerance checks")]
#![expect(clippy::indexing_slicing, reason = "catalogue order is fixed")]

use super::*;

mod fetch_unit;
mod helpers;
mod steps;
mod unit;
