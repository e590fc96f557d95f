//! Shared test harness modules for the rooftally CLI.
#![expect(
    clippy::panic,
    reason = "Tests assert panic branches to surface unexpected CLI outcomes"
)]

use super::*;

mod cache_unit;
mod helpers;
mod unit;
