//! Fallback resolution through a single upstream resolver.
//!
//! No pooling, no round-robin and no caching: every miss is one UDP exchange with the fixed
//! upstream, bounded by a timeout. Successive misses for the same name are queried afresh.

use crate::error::Error;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use trust_dns_proto::op::{Message, MessageType, OpCode, Query};
use trust_dns_proto::rr::{DNSClass, Name, RecordType};

/// Largest upstream reply accepted.
const MAX_REPLY_LEN: usize = 4096;

/// `DynUpstream` is a shareable [`Upstream`] used concurrently by every request worker.
pub type DynUpstream = Arc<dyn Upstream + Send + Sync>;

/// An async trait describing a resolver that answers the queries the hosts table can't.
#[async_trait::async_trait]
pub trait Upstream {
    /// Send `query` and return the reply exactly as decoded from the upstream.
    async fn exchange(&self, query: &Message) -> Result<Message, Error>;
}

/// Build the minimal recursive `A` query sent upstream for `name`.
#[must_use]
pub fn forward_query(name: &Name, id: u16) -> Message {
    let mut query = Query::query(name.clone(), RecordType::A);
    query.set_query_class(DNSClass::IN);

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(query);
    message
}

/// [`Upstream`] over plain UDP to one fixed resolver.
#[derive(Debug, Clone)]
pub struct UdpForwarder {
    addr: SocketAddr,
    timeout: Duration,
}

impl UdpForwarder {
    #[must_use]
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        UdpForwarder { addr, timeout }
    }

    async fn round_trip(&self, request: &[u8]) -> Result<Vec<u8>, Error> {
        let local: SocketAddr = match self.addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local).await.map_err(Error::Upstream)?;
        socket.connect(self.addr).await.map_err(Error::Upstream)?;
        socket.send(request).await.map_err(Error::Upstream)?;

        let mut reply = vec![0u8; MAX_REPLY_LEN];
        let len = socket.recv(&mut reply).await.map_err(Error::Upstream)?;
        reply.truncate(len);
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl Upstream for UdpForwarder {
    async fn exchange(&self, query: &Message) -> Result<Message, Error> {
        let request = query.to_vec().map_err(Error::UpstreamProto)?;
        let reply = tokio::time::timeout(self.timeout, self.round_trip(&request))
            .await
            .map_err(|_| Error::UpstreamTimeout(self.timeout))??;

        let response = Message::from_vec(&reply).map_err(Error::UpstreamProto)?;
        if response.id() != query.id() {
            return Err(Error::UpstreamIdMismatch {
                expected: query.id(),
                actual: response.id(),
            });
        }
        Ok(response)
    }
}
