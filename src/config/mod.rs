//! Configuration management
//!
//! Node settings are a plain value handed to the server; there is no
//! process-wide configuration registry.

pub mod settings;

pub use settings::{Config, DEFAULT_GOSSIP_TTL, DEFAULT_RENDEZVOUS_ADDR};
