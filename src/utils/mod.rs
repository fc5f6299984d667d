//! Utility functions and helpers
//!
//! Digest and clock helpers shared by block construction and mining.

pub mod crypto;

pub use crypto::{current_timestamp, sha256_digest, sha256_hex};
