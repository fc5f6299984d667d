use crate::error::{BlockchainError, Result};
use crate::network::MAX_GOSSIP_TTL;
use crate::storage::DEFAULT_SEEN_CAPACITY;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_RENDEZVOUS_ADDR: &str = "127.0.0.1:55555";
pub const DEFAULT_GOSSIP_TTL: u32 = 3;

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_SYNC_PEER_WAIT: Duration = Duration::from_secs(10);

const NODE_PORT_KEY: &str = "NODE_PORT";
const NODE_IDENTITY_KEY: &str = "NODE_IDENTITY";
const RENDEZVOUS_ADDRESS_KEY: &str = "RENDEZVOUS_ADDRESS";

/// Everything a node instance needs to start
///
/// Built from defaults, then an optional TOML file, then the environment,
/// then command-line flags, each layer overriding the one before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// UDP port to bind; 0 picks an ephemeral port
    pub port: u16,
    /// Display identity, credited by coinbase transactions
    pub identity: String,
    pub rendezvous: SocketAddr,
    /// Host part of the address announced in heartbeats
    pub advertise_host: IpAddr,
    pub heartbeat_interval: Duration,
    pub peer_timeout: Duration,
    /// How long startup sync waits for FULL_CHAIN answers
    pub sync_timeout: Duration,
    /// How long startup sync waits for the first peer list
    pub sync_peer_wait: Duration,
    pub gossip_ttl: u32,
    pub auto_mine: bool,
    pub mine_empty_blocks: bool,
    pub seen_capacity: usize,
}

/// On-disk shape; every key is optional and durations are milliseconds
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    port: Option<u16>,
    identity: Option<String>,
    rendezvous: Option<String>,
    advertise_host: Option<String>,
    heartbeat_interval_ms: Option<u64>,
    peer_timeout_ms: Option<u64>,
    sync_timeout_ms: Option<u64>,
    sync_peer_wait_ms: Option<u64>,
    gossip_ttl: Option<u32>,
    auto_mine: Option<bool>,
    mine_empty_blocks: Option<bool>,
    seen_capacity: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 0,
            identity: Uuid::new_v4().simple().to_string(),
            rendezvous: SocketAddr::from(([127, 0, 0, 1], 55555)),
            advertise_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            peer_timeout: DEFAULT_PEER_TIMEOUT,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            sync_peer_wait: DEFAULT_SYNC_PEER_WAIT,
            gossip_ttl: DEFAULT_GOSSIP_TTL,
            auto_mine: false,
            mine_empty_blocks: false,
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

impl Config {
    /// Defaults, then `path` if given, then the process environment, validated
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = Config::layered(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Same layers as [`Config::load`] but unvalidated, for callers that
    /// still apply command line overrides on top
    pub fn layered(path: Option<&Path>) -> Result<Config> {
        Config::layered_with(path, |key| env::var(key).ok())
    }

    fn layered_with<F>(path: Option<&Path>, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let contents = fs::read_to_string(path).map_err(|e| {
                    BlockchainError::Config(format!("Failed to read {}: {e}", path.display()))
                })?;
                Config::from_toml_str(&contents)?
            }
            None => Config::default(),
        };
        config.apply_env_from(lookup)?;
        Ok(config)
    }

    /// Defaults overridden by a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Config> {
        let file: FileConfig = toml::from_str(contents)?;
        let mut config = Config::default();
        config.apply_file(file)?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<()> {
        if let Some(port) = file.port {
            self.port = port;
        }
        if let Some(identity) = file.identity {
            self.identity = identity;
        }
        if let Some(rendezvous) = file.rendezvous {
            self.rendezvous = parse_socket_addr("rendezvous", &rendezvous)?;
        }
        if let Some(host) = file.advertise_host {
            self.advertise_host = host.parse().map_err(|e| {
                BlockchainError::Config(format!("Invalid advertise_host {host}: {e}"))
            })?;
        }
        if let Some(ms) = file.heartbeat_interval_ms {
            self.heartbeat_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = file.peer_timeout_ms {
            self.peer_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.sync_timeout_ms {
            self.sync_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.sync_peer_wait_ms {
            self.sync_peer_wait = Duration::from_millis(ms);
        }
        if let Some(ttl) = file.gossip_ttl {
            self.gossip_ttl = ttl;
        }
        if let Some(auto_mine) = file.auto_mine {
            self.auto_mine = auto_mine;
        }
        if let Some(mine_empty_blocks) = file.mine_empty_blocks {
            self.mine_empty_blocks = mine_empty_blocks;
        }
        if let Some(capacity) = file.seen_capacity {
            self.seen_capacity = capacity;
        }
        Ok(())
    }

    /// Apply `NODE_PORT`, `NODE_IDENTITY` and `RENDEZVOUS_ADDRESS` via `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(NODE_PORT_KEY) {
            self.port = port.trim().parse().map_err(|e| {
                BlockchainError::Config(format!("Invalid {NODE_PORT_KEY} {port}: {e}"))
            })?;
        }
        if let Some(identity) = lookup(NODE_IDENTITY_KEY) {
            self.identity = identity;
        }
        if let Some(rendezvous) = lookup(RENDEZVOUS_ADDRESS_KEY) {
            self.rendezvous = parse_socket_addr(RENDEZVOUS_ADDRESS_KEY, rendezvous.trim())?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            return Err(BlockchainError::Config(
                "Node identity must not be empty".to_string(),
            ));
        }
        if self.gossip_ttl == 0 || self.gossip_ttl > MAX_GOSSIP_TTL {
            return Err(BlockchainError::Config(format!(
                "gossip_ttl must be between 1 and {MAX_GOSSIP_TTL}, got {}",
                self.gossip_ttl
            )));
        }
        for (name, value) in [
            ("heartbeat_interval", self.heartbeat_interval),
            ("peer_timeout", self.peer_timeout),
            ("sync_timeout", self.sync_timeout),
        ] {
            if value.is_zero() {
                return Err(BlockchainError::Config(format!("{name} must be non-zero")));
            }
        }
        if self.seen_capacity == 0 {
            return Err(BlockchainError::Config(
                "seen_capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Address announced to the rendezvous once the socket is bound
    pub fn advertise_addr(&self, bound_port: u16) -> SocketAddr {
        SocketAddr::new(self.advertise_host, bound_port)
    }
}

pub fn parse_socket_addr(name: &str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|e| BlockchainError::Config(format!("Invalid {name} address {value}: {e}")))
}
