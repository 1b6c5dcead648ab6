//! Test fixtures
//!
//! Isolated stores under temporary directories and a low difficulty so
//! unit tests mine blocks quickly.

pub mod test_utils;

pub use test_utils::*;
