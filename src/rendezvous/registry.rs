use log::info;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Last heartbeat seen from each registered node
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<SocketAddr, Instant>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Record a heartbeat from `addr`; returns true for a new registration
    pub fn record(&mut self, addr: SocketAddr, now: Instant) -> bool {
        let is_new = self.entries.insert(addr, now).is_none();
        if is_new {
            info!("Registered node {addr}");
        }
        is_new
    }

    /// Drop nodes silent for longer than `max_age`
    pub fn prune(&mut self, max_age: Duration, now: Instant) -> Vec<SocketAddr> {
        let stale: Vec<SocketAddr> = self
            .entries
            .iter()
            .filter(|(_, last_seen)| now.saturating_duration_since(**last_seen) > max_age)
            .map(|(addr, _)| *addr)
            .collect();
        for addr in &stale {
            self.entries.remove(addr);
            info!("Dropped stale node {addr}");
        }
        stale
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.entries.keys().copied().collect()
    }

    /// "ip:port" strings as carried by a PEERS message
    pub fn peer_list(&self) -> Vec<String> {
        self.entries.keys().map(|addr| addr.to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
