//! UDP DNS responder.
//!
//! # Static Records
//!
//! Queries whose name is in the [hosts table][crate::hosts] are answered authoritatively with
//! exactly one `A` record and a TTL of one second. Names are matched case-insensitively, with or
//! without a trailing dot. No type filtering is done: any query type for a known name gets the
//! `A` answer.
//!
//! E.g. with `hosts.json`:
//! ```json
//! { "app1.mydomain.com": "1.2.3.4" }
//! ```
//!
//! An `A` class query for `app1.mydomain.com` would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 app1.mydomain.com A +noall +answer
//! app1.mydomain.com.      1       IN      A       1.2.3.4
//! ```
//!
//! If the configured value isn't an IPv4 literal the reply is `SERVFAIL` with no answers.
//!
//! # Forwarding
//!
//! Any other name is forwarded as a recursive `A` query to the
//! [upstream resolver][crate::config::Config::upstream_addr] and the upstream's reply is relayed
//! as received. If the upstream can't be reached within the
//! [timeout][crate::config::Config::upstream_timeout] the reply is `SERVFAIL`.
//!
//! # Malformed Queries
//!
//! Datagrams that don't decode as a DNS message, or that carry no question, are dropped without
//! a reply.

pub mod forwarder;
pub mod handlers;
pub mod pool;
pub mod server;

use crate::config::Config;
use crate::error::Error;
use crate::shutdown::ShutdownCoordinator;
use handlers::Handler;
use server::Server;
use std::net::SocketAddr;

/// One received datagram, detached from the receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundDatagram {
    pub payload: Vec<u8>,
    pub peer: SocketAddr,
    /// Transaction id read from the first two payload bytes, before full decode. Replies carry
    /// this id.
    pub id: u16,
}

impl InboundDatagram {
    /// Returns `None` when the payload is too short to hold a transaction id.
    #[must_use]
    pub fn new(payload: Vec<u8>, peer: SocketAddr) -> Option<Self> {
        let id = match payload.as_slice() {
            [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
            _ => return None,
        };
        Some(InboundDatagram { payload, peer, id })
    }
}

/// Bind a [`Server`] for `config`.
///
/// # Errors
///
/// Returns [`Error::Bind`] if the listening socket can't be bound.
pub async fn new(
    config: &Config,
    handler: Handler,
    shutdown: &ShutdownCoordinator,
) -> Result<Server, Error> {
    Server::bind(config, handler, shutdown).await
}
