//! Proof-of-work mining
//!
//! The search itself is a plain loop over nonces that polls a
//! [`CancellationToken`]; the ledger cancels every registered token the
//! moment the tip moves, and the worker loop restarts on the new tip.

pub mod cancel;
pub mod miner;
pub mod signal;
pub mod worker;

pub use cancel::CancellationToken;
pub use miner::Miner;
pub use signal::WorkSignal;
pub use worker::{MiningJob, MiningWorker};
