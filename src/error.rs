//! Error types.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use trust_dns_proto::error::ProtoError;

/// Error enumerates the possible hostcrab error states.
///
/// Startup errors ([`Error::HostsUnreadable`], [`Error::HostsInvalid`], [`Error::Bind`] and
/// [`Error::InvalidSetting`]) are fatal. Every other variant is scoped to a single request and
/// never leaves the [`Handler`][crate::dns::handlers::Handler] that produced it.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned when the hosts file is missing or can't be read.
    #[error("unable to read hosts file {path:?}")]
    HostsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Returned when the hosts file isn't a flat JSON object of string to string.
    #[error("invalid JSON in hosts file {path:?}")]
    HostsInvalid {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Returned when the DNS listening socket can't be bound.
    #[error("unable to bind UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Returned when an environment override holds a value that can't be used.
    #[error("invalid value {value:?} for {name}")]
    InvalidSetting { name: &'static str, value: String },

    /// Returned when an inbound datagram isn't a valid DNS message. The datagram is dropped
    /// without a reply.
    #[error("malformed DNS query")]
    Decode(#[source] ProtoError),

    /// Returned when an inbound DNS message has an empty question section. The datagram is
    /// dropped without a reply.
    #[error("DNS query has no question")]
    NoQuestion,

    /// Returned when the hosts table maps a name to a value that isn't an IPv4 literal.
    #[error("Invalid IP in hosts file: {ip}")]
    InvalidRecordIp { host: String, ip: String },

    /// Returned when the exchange with the upstream resolver fails at the transport layer.
    #[error("upstream transport error: {0}")]
    Upstream(#[source] std::io::Error),

    /// Returned when the upstream resolver doesn't answer within the configured timeout.
    #[error("upstream resolver timed out after {0:?}")]
    UpstreamTimeout(Duration),

    /// Returned when the forwarding query can't be encoded, or the upstream reply can't be
    /// decoded.
    #[error("invalid upstream exchange: {0}")]
    UpstreamProto(#[source] ProtoError),

    /// Returned when the upstream reply doesn't carry the transaction id that was sent.
    #[error("upstream reply id {actual} does not match query id {expected}")]
    UpstreamIdMismatch { expected: u16, actual: u16 },

    /// Returned when a reply can't be encoded to wire format. The reply is dropped.
    #[error("Error packing DNS response: {0}")]
    Encode(#[source] ProtoError),
}

