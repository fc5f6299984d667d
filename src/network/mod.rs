//! Datagram networking
//!
//! Every message is one self-describing JSON datagram over UDP. There are
//! no connections, acknowledgements or retries; gossip redundancy is the
//! only delivery guarantee.

pub mod gossip;
pub mod message;
pub mod peer_directory;
pub mod server;
pub mod transport;

pub use gossip::GossipEngine;
pub use message::{GossipMessage, MAX_DATAGRAM_SIZE, MAX_GOSSIP_TTL};
pub use peer_directory::{PeerDirectory, PeerRecord};
pub use server::Server;
pub use transport::{MemoryTransport, Transport};
