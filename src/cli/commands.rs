use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "gossip-chain", about = "UDP gossip proof-of-work blockchain node")]
pub struct Opt {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    #[command(name = "startnode", about = "Start a blockchain node")]
    StartNode {
        #[arg(long, help = "UDP port to bind (0 picks a free port)")]
        port: Option<u16>,
        #[arg(long, help = "Display identity credited by mined blocks")]
        identity: Option<String>,
        #[arg(long, help = "Rendezvous address as ip:port")]
        rendezvous: Option<String>,
        #[arg(long, help = "TOML configuration file")]
        config: Option<PathBuf>,
        #[arg(long, help = "Mine continuously in the background")]
        mine: bool,
        #[arg(long = "mine-empty", help = "Also mine blocks with no transactions")]
        mine_empty: bool,
        #[arg(long = "no-console", help = "Run without the interactive console")]
        no_console: bool,
    },
    #[command(name = "rendezvous", about = "Run the peer rendezvous registry")]
    Rendezvous {
        #[arg(long, default_value_t = 55555, help = "UDP port to bind")]
        port: u16,
        #[arg(
            long = "broadcast-interval-ms",
            default_value_t = 5000,
            help = "How often the peer list is sent to every node"
        )]
        broadcast_interval_ms: u64,
        #[arg(
            long = "stale-after-ms",
            default_value_t = 30000,
            help = "Forget nodes silent for this long"
        )]
        stale_after_ms: u64,
    },
}
