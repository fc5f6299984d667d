use crate::error::{BlockchainError, Result};
use log::{info, warn};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub address: SocketAddr,
    pub last_seen: Instant,
}

/// Known peer addresses, refreshed from the rendezvous service
///
/// A received peer list is merged rather than swapped in: listed peers are
/// added or refreshed, unlisted ones age out once `prune_stale` finds them
/// older than the peer timeout. The node's own address is never recorded.
pub struct PeerDirectory {
    self_addr: SocketAddr,
    inner: RwLock<BTreeMap<SocketAddr, PeerRecord>>,
}

impl PeerDirectory {
    pub fn new(self_addr: SocketAddr) -> Self {
        Self {
            self_addr,
            inner: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get_self_addr(&self) -> SocketAddr {
        self.self_addr
    }

    /// The rendezvous reports us under whatever address it observed
    pub fn is_self(&self, addr: &SocketAddr) -> bool {
        if *addr == self.self_addr {
            return true;
        }
        addr.port() == self.self_addr.port()
            && (addr.ip().is_loopback() || addr.ip().is_unspecified())
            && (self.self_addr.ip().is_loopback() || self.self_addr.ip().is_unspecified())
    }

    /// Merge an "ip:port" list; returns the peers that were not known before
    pub fn merge(&self, addresses: &[String]) -> Result<Vec<SocketAddr>> {
        let now = Instant::now();
        let mut inner = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;

        let mut added = vec![];
        for entry in addresses {
            let address = match entry.parse::<SocketAddr>() {
                Ok(address) => address,
                Err(e) => {
                    warn!("Ignoring malformed peer address {entry}: {e}");
                    continue;
                }
            };
            if self.is_self(&address) {
                continue;
            }
            let previous = inner.insert(
                address,
                PeerRecord {
                    address,
                    last_seen: now,
                },
            );
            if previous.is_none() {
                added.push(address);
            }
        }

        if !added.is_empty() {
            info!("Learned {} new peer(s): {added:?}", added.len());
        }
        Ok(added)
    }

    /// Record direct contact from `address`; returns true if it is new
    pub fn touch(&self, address: SocketAddr) -> Result<bool> {
        if self.is_self(&address) {
            return Ok(false);
        }
        let mut inner = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let previous = inner.insert(
            address,
            PeerRecord {
                address,
                last_seen: Instant::now(),
            },
        );
        Ok(previous.is_none())
    }

    /// Forget peers not refreshed within `max_age`
    pub fn prune_stale(&self, max_age: Duration) -> Result<Vec<SocketAddr>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;

        let stale: Vec<SocketAddr> = inner
            .values()
            .filter(|record| record.last_seen.elapsed() > max_age)
            .map(|record| record.address)
            .collect();
        for address in &stale {
            inner.remove(address);
        }

        if !stale.is_empty() {
            info!("Pruned {} stale peer(s): {stale:?}", stale.len());
        }
        Ok(stale)
    }

    pub fn peers(&self) -> Result<Vec<SocketAddr>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(inner.keys().copied().collect())
    }

    pub fn records(&self) -> Result<Vec<PeerRecord>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(inner.values().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.peers()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn directory() -> PeerDirectory {
        PeerDirectory::new("127.0.0.1:7001".parse().unwrap())
    }

    #[test]
    fn test_merge_reports_only_new_peers() {
        let peers = directory();
        let added = peers
            .merge(&["127.0.0.1:7002".to_string(), "127.0.0.1:7003".to_string()])
            .unwrap();
        assert_eq!(added.len(), 2);

        let added = peers
            .merge(&["127.0.0.1:7003".to_string(), "127.0.0.1:7004".to_string()])
            .unwrap();
        assert_eq!(added, vec!["127.0.0.1:7004".parse::<SocketAddr>().unwrap()]);
        // Merge keeps peers missing from the latest list
        assert_eq!(peers.len().unwrap(), 3);
    }

    #[test]
    fn test_self_and_malformed_entries_are_skipped() {
        let peers = directory();
        let added = peers
            .merge(&[
                "127.0.0.1:7001".to_string(),
                "0.0.0.0:7001".to_string(),
                "not-an-address".to_string(),
                "10.0.0.5:7001".to_string(),
            ])
            .unwrap();
        assert_eq!(added, vec!["10.0.0.5:7001".parse::<SocketAddr>().unwrap()]);
        assert!(!peers.touch("127.0.0.1:7001".parse().unwrap()).unwrap());
    }

    #[test]
    fn test_prune_stale_removes_old_records() {
        let peers = directory();
        peers.merge(&["127.0.0.1:7002".to_string()]).unwrap();
        thread::sleep(Duration::from_millis(30));
        peers.touch("127.0.0.1:7003".parse().unwrap()).unwrap();

        let pruned = peers.prune_stale(Duration::from_millis(20)).unwrap();
        assert_eq!(pruned, vec!["127.0.0.1:7002".parse::<SocketAddr>().unwrap()]);
        assert_eq!(
            peers.peers().unwrap(),
            vec!["127.0.0.1:7003".parse::<SocketAddr>().unwrap()]
        );
    }
}
