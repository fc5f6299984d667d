use crate::consensus::{BlockAcceptance, ConsensusManager, ReplaceOutcome};
use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::mining::CancellationToken;
use crate::network::{GossipMessage, Transport, MAX_GOSSIP_TTL};
use crate::node::NodeState;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

/// Dedup, TTL-bounded flooding and per-kind dispatch for inbound datagrams
pub struct GossipEngine {
    state: Arc<NodeState>,
    consensus: Arc<ConsensusManager>,
    transport: Arc<dyn Transport>,
    /// Hop budget stamped on messages this node originates
    gossip_ttl: u32,
}

impl GossipEngine {
    pub fn new(
        consensus: Arc<ConsensusManager>,
        transport: Arc<dyn Transport>,
        gossip_ttl: u32,
    ) -> GossipEngine {
        GossipEngine {
            state: Arc::clone(consensus.state()),
            consensus,
            transport,
            gossip_ttl: gossip_ttl.min(MAX_GOSSIP_TTL),
        }
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    pub fn consensus(&self) -> &Arc<ConsensusManager> {
        &self.consensus
    }

    pub fn get_gossip_ttl(&self) -> u32 {
        self.gossip_ttl
    }

    /// Decode and dispatch one raw datagram, logging instead of failing
    pub fn handle_datagram(&self, payload: &[u8], sender: SocketAddr) {
        let message = match GossipMessage::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping datagram from {sender}: {e}");
                return;
            }
        };
        let kind = message.kind();
        if let Err(e) = self.handle(message, sender) {
            match e {
                BlockchainError::ConsensusConflict { .. } => {
                    info!("{kind} from {sender}: {e}")
                }
                _ => warn!("Rejected {kind} from {sender}: {e}"),
            }
        }
    }

    /// Dispatch one decoded message received from `sender`
    pub fn handle(&self, message: GossipMessage, sender: SocketAddr) -> Result<()> {
        match message {
            GossipMessage::Tx {
                id,
                sender: from,
                recipient,
                amount,
                timestamp,
                ttl,
            } => {
                let tx = Transaction::from_parts(&id, &from, &recipient, amount, timestamp);
                self.handle_tx(tx, ttl, sender)
            }
            GossipMessage::Block { block, ttl } => self.handle_block(block, ttl, sender),
            GossipMessage::ReqChain => self.handle_req_chain(sender),
            GossipMessage::FullChain { chain } => self.handle_full_chain(chain, sender),
            GossipMessage::Peers { peers } => self.handle_peers(&peers),
            GossipMessage::Heartbeat { origin } => {
                debug!("Heartbeat from {sender} ({origin})");
                self.state.peers().touch(sender)?;
                Ok(())
            }
        }
    }

    fn handle_tx(&self, tx: Transaction, ttl: u32, sender: SocketAddr) -> Result<()> {
        if self.state.seen().has_transaction(tx.get_id()) {
            debug!("Dropping duplicate transaction {}", tx.get_id());
            return Ok(());
        }
        tx.validate_shape()?;
        if !self.state.seen().mark_transaction(tx.get_id()) {
            return Ok(());
        }

        let added = self.state.write_ledger()?.add_transaction(tx.clone())?;
        if !added {
            debug!(
                "Transaction {} is already confirmed or pending, not forwarding",
                tx.get_id()
            );
            return Ok(());
        }
        info!("Transaction {} added to mempool", tx.get_id());
        self.state.work().notify();

        match next_hop_ttl(ttl) {
            Some(ttl) => {
                self.broadcast(&GossipMessage::tx(&tx, ttl), Some(sender))?;
            }
            None => debug!("Transaction {} reached ttl 0, not forwarding", tx.get_id()),
        }
        Ok(())
    }

    fn handle_block(&self, block: Block, ttl: u32, sender: SocketAddr) -> Result<()> {
        if self.state.seen().has_block(block.get_hash()) {
            debug!("Dropping duplicate block {}", block.get_hash());
            return Ok(());
        }

        let hash = block.get_hash().to_string();
        match self.consensus.accept_block(block.clone())? {
            BlockAcceptance::Appended { .. } => {
                self.state.seen().mark_block(&hash);
                match next_hop_ttl(ttl) {
                    Some(ttl) => {
                        self.broadcast(&GossipMessage::block(block, ttl), Some(sender))?;
                    }
                    None => debug!("Block {hash} reached ttl 0, not forwarding"),
                }
            }
            BlockAcceptance::Detached => {
                info!(
                    "Block {} from {sender} does not extend our tip, requesting its chain",
                    block.get_index()
                );
                self.request_chain(sender)?;
            }
        }
        Ok(())
    }

    fn handle_req_chain(&self, sender: SocketAddr) -> Result<()> {
        let snapshot = self.state.chain_snapshot()?;
        debug!("Sending chain of length {} to {sender}", snapshot.len());
        self.send(
            &GossipMessage::FullChain {
                chain: snapshot.as_ref().clone(),
            },
            sender,
        )
    }

    fn handle_full_chain(&self, chain: Vec<Block>, sender: SocketAddr) -> Result<()> {
        match self.consensus.handle_full_chain(chain, sender)? {
            ReplaceOutcome::Replaced(_) => {}
            ReplaceOutcome::KeptLocal {
                local_len,
                candidate_len,
            } => debug!(
                "Keeping local chain of length {local_len} over length {candidate_len} from {sender}"
            ),
        }
        Ok(())
    }

    fn handle_peers(&self, peers: &[String]) -> Result<()> {
        for peer in self.state.peers().merge(peers)? {
            if let Err(e) = self.request_chain(peer) {
                warn!("Failed to request chain from new peer {peer}: {e}");
            }
        }
        Ok(())
    }

    /// Originate a transaction on this node and gossip it
    pub fn submit_transaction(&self, tx: Transaction) -> Result<bool> {
        tx.validate_shape()?;
        self.state.seen().mark_transaction(tx.get_id());
        if !self.state.write_ledger()?.add_transaction(tx.clone())? {
            return Ok(false);
        }
        info!("Submitted transaction {}", tx.get_id());
        self.state.work().notify();
        self.broadcast(&GossipMessage::tx(&tx, self.gossip_ttl), None)?;
        Ok(true)
    }

    /// Accept a locally mined block and broadcast it if it still extends the tip
    pub fn submit_mined_block(&self, block: Block, token: &CancellationToken) -> Result<bool> {
        let hash = block.get_hash().to_string();
        let index = block.get_index();
        if !self.consensus.accept_mined_block(block.clone(), token)? {
            return Ok(false);
        }
        self.state.seen().mark_block(&hash);
        let sent = self.broadcast(&GossipMessage::block(block, self.gossip_ttl), None)?;
        info!("Mined block {index} ({hash}), broadcast to {sent} peer(s)");
        Ok(true)
    }

    /// Send to every known peer except `except`; returns how many sends succeeded
    pub fn broadcast(&self, message: &GossipMessage, except: Option<SocketAddr>) -> Result<usize> {
        let payload = message.encode()?;
        let mut sent = 0;
        for peer in self.state.peers().peers()? {
            if Some(peer) == except {
                continue;
            }
            match self.transport.send_to(&payload, peer) {
                Ok(()) => sent += 1,
                Err(e) => warn!("{} to {peer} failed: {e}", message.kind()),
            }
        }
        Ok(sent)
    }

    pub fn send(&self, message: &GossipMessage, addr: SocketAddr) -> Result<()> {
        let payload = message.encode()?;
        self.transport.send_to(&payload, addr)
    }

    pub fn request_chain(&self, addr: SocketAddr) -> Result<()> {
        self.send(&GossipMessage::ReqChain, addr)
    }
}

/// Clamp an inbound hop counter and spend one hop; `None` once exhausted
fn next_hop_ttl(ttl: u32) -> Option<u32> {
    match ttl.min(MAX_GOSSIP_TTL) {
        0 => None,
        ttl => Some(ttl - 1),
    }
}
