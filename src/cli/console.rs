use crate::core::monetary::conversions::{coins_to_units, format_units};
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::mining::{CancellationToken, MiningWorker};
use crate::network::GossipEngine;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

const HELP: &str = "Commands: CHAIN, MEMPOOL, PEERS, MINE, TX <recipient> <amount>, QUIT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleReply {
    Output(String),
    Quit,
}

/// Line-oriented operator console over a running node
pub struct Console {
    engine: Arc<GossipEngine>,
    worker: MiningWorker,
}

impl Console {
    pub fn new(engine: Arc<GossipEngine>) -> Console {
        let worker = MiningWorker::new(Arc::clone(&engine), true, CancellationToken::new());
        Console { engine, worker }
    }

    /// Read commands from `input` until QUIT or end of input
    pub fn run<R: BufRead>(&self, input: R) {
        println!("{HELP}");
        prompt();
        for line in input.lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Console input failed: {e}");
                    break;
                }
            };
            match self.execute(&line) {
                Ok(ConsoleReply::Output(text)) if !text.is_empty() => println!("{text}"),
                Ok(ConsoleReply::Output(_)) => {}
                Ok(ConsoleReply::Quit) => break,
                Err(e) => println!("Error: {e}"),
            }
            prompt();
        }
    }

    pub fn execute(&self, line: &str) -> Result<ConsoleReply> {
        let mut words = line.split_whitespace();
        let head = match words.next() {
            Some(head) => head.to_uppercase(),
            None => return Ok(ConsoleReply::Output(String::new())),
        };
        let rest: Vec<&str> = words.collect();
        let state = self.engine.state();

        let output = match head.as_str() {
            "CHAIN" => serde_json::to_string_pretty(state.chain_snapshot()?.as_ref())?,
            "MEMPOOL" => serde_json::to_string_pretty(&state.mempool_snapshot()?)?,
            "PEERS" => {
                let records = state.peers().records()?;
                if records.is_empty() {
                    "No known peers".to_string()
                } else {
                    records
                        .iter()
                        .map(|record| {
                            format!(
                                "{} (seen {}s ago)",
                                record.address,
                                record.last_seen.elapsed().as_secs()
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            "MINE" => match self.worker.mine_once(true)? {
                Some(block) => format!(
                    "Mined block {} (txs={}) {}",
                    block.get_index(),
                    block.get_transactions().len(),
                    block.get_hash()
                ),
                None => "Mining aborted: the tip moved, try again".to_string(),
            },
            "TX" => self.submit(&rest)?,
            "QUIT" | "EXIT" => return Ok(ConsoleReply::Quit),
            _ => HELP.to_string(),
        };
        Ok(ConsoleReply::Output(output))
    }

    fn submit(&self, args: &[&str]) -> Result<String> {
        let (recipient, amount) = match args {
            [recipient, amount] => (*recipient, *amount),
            _ => return Ok("Usage: TX <recipient> <amount>".to_string()),
        };
        let units = amount
            .parse::<f64>()
            .ok()
            .and_then(coins_to_units)
            .ok_or_else(|| BlockchainError::InvalidTransaction(format!("Invalid amount {amount}")))?;

        let tx = Transaction::new(self.engine.state().get_identity(), recipient, units)?;
        let id = tx.get_id().to_string();
        if self.engine.submit_transaction(tx)? {
            Ok(format!(
                "TX {id} accepted and broadcast: {} to {recipient}",
                format_units(units)
            ))
        } else {
            Ok("TX rejected or duplicate".to_string())
        }
    }
}

fn prompt() {
    print!("--> ");
    let _ = io::stdout().flush();
}
