//! Test utilities.

pub mod testutil;
