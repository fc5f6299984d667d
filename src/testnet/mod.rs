//! Fixtures for unit tests
//!
//! Mined chains, node state and in-memory gossip engines that tests across
//! the crate share.

pub mod test_utils;

pub use test_utils::*;
