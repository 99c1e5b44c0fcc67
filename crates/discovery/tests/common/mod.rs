//! Test infrastructure shared by the integration tests.
//!
//! Each test binary compiles this module separately and uses a different
//! subset of it.
#![allow(dead_code)]

pub mod fixtures;
#[macro_use]
pub mod harness;

pub use fixtures::*;
pub use harness::*;
