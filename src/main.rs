// Entry point for the node and rendezvous binaries
use clap::Parser;
use gossip_chain::config::settings::parse_socket_addr;
use gossip_chain::{Command, Config, Console, Opt, RendezvousServer, Server};
use log::{error, LevelFilter};
use std::io;
use std::process;
use std::time::Duration;

fn main() {
    // Info by default, RUST_LOG still wins
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let opt = Opt::parse();

    if let Err(e) = run_command(opt.command) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::StartNode {
            port,
            identity,
            rendezvous,
            config,
            mine,
            mine_empty,
            no_console,
        } => {
            // Defaults, then file and environment, then flags
            let mut config = Config::layered(config.as_deref())?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(identity) = identity {
                config.identity = identity;
            }
            if let Some(rendezvous) = rendezvous {
                config.rendezvous = parse_socket_addr("rendezvous", &rendezvous)?;
            }
            config.auto_mine |= mine;
            config.mine_empty_blocks |= mine_empty;
            config.validate()?;

            let server = Server::bind(config)?;
            println!(
                "My identity: {}  UDP: {}",
                server.engine().state().get_identity(),
                server.local_addr()
            );

            if no_console {
                server.run(None::<fn(&Server)>)?;
            } else {
                server.run(Some(|server: &Server| {
                    Console::new(server.engine().clone()).run(io::stdin().lock())
                }))?;
            }
        }
        Command::Rendezvous {
            port,
            broadcast_interval_ms,
            stale_after_ms,
        } => {
            let mut server = RendezvousServer::bind(
                port,
                Duration::from_millis(broadcast_interval_ms),
                Duration::from_millis(stale_after_ms),
            )?;
            server.run()?;
        }
    }
    Ok(())
}
