use crate::dns::forwarder::{forward_query, DynUpstream};
use crate::dns::InboundDatagram;
use crate::error::Error;
use crate::hosts::{normalize, SharedHostTable};
use crate::logger::LogHandle;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tracing::debug;
use trust_dns_proto::op::{Message, MessageType, Query, ResponseCode};
use trust_dns_proto::rr::{DNSClass, RData, Record};

/// TTL of synthesized answers. Kept at one second so requesters re-check the table on every
/// query instead of caching downstream.
pub const ANSWER_TTL: u32 = 1;

/// Per-datagram request processing: decode, look up or forward, encode, log.
///
/// Cloned into every worker task. Nothing in here is mutable, so concurrent requests never
/// observe each other.
#[derive(Clone)]
pub struct Handler {
    hosts: SharedHostTable,
    upstream: DynUpstream,
    log: LogHandle,
}

impl Handler {
    #[must_use]
    pub fn new(hosts: SharedHostTable, upstream: DynUpstream, log: LogHandle) -> Self {
        Handler {
            hosts,
            upstream,
            log,
        }
    }

    pub(crate) fn log(&self) -> &LogHandle {
        &self.log
    }

    /// Produce the wire reply for one datagram, or `None` when no reply must be sent.
    ///
    /// Malformed queries, queries without a question and replies that fail to encode are all
    /// dropped. Every failure stays local to this request.
    pub async fn handle_datagram(&self, datagram: &InboundDatagram) -> Option<Vec<u8>> {
        self.log.request(datagram.peer, &datagram.payload).await;
        let outcome = self.dispatch_request(datagram).await;
        self.settle(datagram.peer, outcome).await
    }

    async fn settle(&self, peer: SocketAddr, outcome: Result<Vec<u8>, Error>) -> Option<Vec<u8>> {
        match outcome {
            Ok(wire) => {
                self.log.response(peer, &wire).await;
                Some(wire)
            }
            Err(err @ (Error::Decode(_) | Error::NoQuestion)) => {
                debug!("dropping datagram from {peer}: {err}");
                None
            }
            // Oversized replies are truncated by the codec, so `Encode` only surfaces for a
            // message in an unencodable state (bad label, unsupported rdata).
            Err(err) => {
                self.log.push(err.to_string()).await;
                None
            }
        }
    }

    async fn dispatch_request(&self, datagram: &InboundDatagram) -> Result<Vec<u8>, Error> {
        let request = Message::from_vec(&datagram.payload).map_err(Error::Decode)?;
        let query = request.queries().first().ok_or(Error::NoQuestion)?;
        let host = normalize(&query.name().to_ascii());

        let response = match self.hosts.lookup(&host) {
            Some(ip) => self.handle_hit(&request, query, datagram.id, &host, ip).await,
            None => self.handle_miss(&request, query, datagram.id).await,
        };
        response.to_vec().map_err(Error::Encode)
    }

    async fn handle_hit(
        &self,
        request: &Message,
        query: &Query,
        id: u16,
        host: &str,
        ip: &str,
    ) -> Message {
        let mut response = reply_shell(request, id);
        match a_record(query, host, ip) {
            Ok(record) => {
                response.add_answer(record);
            }
            Err(err) => {
                self.log.push(err.to_string()).await;
                response.set_response_code(ResponseCode::ServFail);
            }
        }
        response
    }

    async fn handle_miss(&self, request: &Message, query: &Query, id: u16) -> Message {
        let fallback = forward_query(query.name(), id);
        match self.upstream.exchange(&fallback).await {
            Ok(upstream_response) => upstream_response,
            Err(err) => {
                self.log
                    .push(format!("Error querying upstream resolver: {err}"))
                    .await;
                let mut response = reply_shell(request, id);
                response.set_response_code(ResponseCode::ServFail);
                response
            }
        }
    }
}

/// A response bound to `request`: same question, op code and RD/CD flags, authoritative, and
/// carrying the dispatcher's transaction id rather than the decoded one.
#[must_use]
pub fn reply_shell(request: &Message, id: u16) -> Message {
    let mut response = Message::new();
    response
        .set_id(id)
        .set_message_type(MessageType::Response)
        .set_op_code(request.op_code())
        .set_recursion_desired(request.recursion_desired())
        .set_checking_disabled(request.checking_disabled())
        .set_authoritative(true)
        .set_response_code(ResponseCode::NoError)
        .add_queries(request.queries().iter().take(1).cloned());
    response
}

/// The single `A` answer for a table hit, owned by the question name as the client sent it.
fn a_record(query: &Query, host: &str, ip: &str) -> Result<Record, Error> {
    let addr = Ipv4Addr::from_str(ip).map_err(|_| Error::InvalidRecordIp {
        host: host.to_string(),
        ip: ip.to_string(),
    })?;
    let mut record = Record::from_rdata(query.name().clone(), ANSWER_TTL, RData::A(addr));
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}
