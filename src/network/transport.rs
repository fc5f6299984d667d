use crate::error::{BlockchainError, Result};
use crate::network::GossipMessage;
use log::warn;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Mutex;

/// Fire-and-forget datagram sender used by the gossip engine
pub trait Transport: Send + Sync {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<()>;
}

impl Transport for UdpSocket {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<()> {
        UdpSocket::send_to(self, payload, addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to send to {addr}: {e}")))?;
        Ok(())
    }
}

/// Records outbound datagrams instead of sending them
///
/// Lets several nodes run in one process with delivery driven explicitly,
/// in any order, any number of times.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    outbox: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

impl MemoryTransport {
    pub fn new() -> MemoryTransport {
        MemoryTransport::default()
    }

    /// Take every datagram sent so far, decoded
    pub fn drain(&self) -> Vec<(SocketAddr, GossipMessage)> {
        let sent = match self.outbox.lock() {
            Ok(mut outbox) => std::mem::take(&mut *outbox),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        sent.into_iter()
            .filter_map(|(addr, payload)| match GossipMessage::decode(&payload) {
                Ok(message) => Some((addr, message)),
                Err(e) => {
                    warn!("Recorded undecodable datagram to {addr}: {e}");
                    None
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        match self.outbox.lock() {
            Ok(outbox) => outbox.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Transport for MemoryTransport {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> Result<()> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire outbox lock: {e}")))?;
        outbox.push((addr, payload.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_transport_records_and_drains() {
        let transport = MemoryTransport::new();
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let payload = GossipMessage::ReqChain.encode().unwrap();
        transport.send_to(&payload, addr).unwrap();

        assert_eq!(transport.len(), 1);
        assert_eq!(transport.drain(), vec![(addr, GossipMessage::ReqChain)]);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_udp_transport_delivers_datagram() {
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();

        let payload = GossipMessage::ReqChain.encode().unwrap();
        Transport::send_to(&sender, &payload, receiver.local_addr().unwrap()).unwrap();

        let mut buf = [0u8; 128];
        let (len, from) = receiver.recv_from(&mut buf).unwrap();
        assert_eq!(from, sender.local_addr().unwrap());
        assert_eq!(GossipMessage::decode(&buf[..len]).unwrap(), GossipMessage::ReqChain);
    }
}
