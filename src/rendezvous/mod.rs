//! Rendezvous registry
//!
//! The discovery service nodes heartbeat to. It knows nothing about chains;
//! it only hands out the current list of live node addresses.

pub mod registry;
pub mod service;

pub use registry::Registry;
pub use service::{RendezvousServer, DEFAULT_RENDEZVOUS_PORT};
