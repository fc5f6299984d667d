//! Command-line interface
//!
//! clap argument parsing for the node and rendezvous binaries, plus the
//! interactive console a running node reads from stdin.

pub mod commands;
pub mod console;

pub use commands::{Command, Opt};
pub use console::{Console, ConsoleReply};
