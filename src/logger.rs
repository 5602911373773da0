//! Asynchronous request log.
//!
//! Request workers hand fully formatted events to a bounded queue and a single consumer task
//! writes them out in FIFO order, one event at a time, so lines from concurrent requests are
//! never interleaved. A producer only waits when the queue is full; events are never dropped.
//!
//! Operational diagnostics (startup, socket errors, shutdown) go through [`tracing`] instead.

use lazy_static::lazy_static;
use std::net::SocketAddr;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use trust_dns_proto::op::Message;

lazy_static! {
    static ref TIMESTAMP_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(
            version = 2,
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        );
}

/// Which side of an exchange a dump describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Request,
    Response,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Request => "REQUEST",
            Direction::Response => "RESPONSE",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Response => "response",
        }
    }
}

/// Producer side of the log queue. Cheap to clone; the consumer stops once every handle is
/// dropped and the queue is empty.
#[derive(Clone, Debug)]
pub struct LogHandle {
    tx: mpsc::Sender<String>,
}

impl LogHandle {
    /// Queue a formatted event, waiting for room if the queue is full.
    pub async fn push(&self, event: String) {
        if let Err(err) = self.tx.send(event).await {
            tracing::warn!("log consumer has stopped, discarding: {}", err.0);
        }
    }

    /// Queue a timestamped dump of inbound DNS bytes.
    pub async fn request(&self, peer: SocketAddr, wire: &[u8]) {
        self.push(format_dump(Direction::Request, peer, wire)).await;
    }

    /// Queue a timestamped dump of outbound DNS bytes.
    pub async fn response(&self, peer: SocketAddr, wire: &[u8]) {
        self.push(format_dump(Direction::Response, peer, wire)).await;
    }
}

/// Start the consumer writing to standard output.
#[must_use]
pub fn spawn(capacity: usize) -> (LogHandle, JoinHandle<std::io::Result<tokio::io::Stdout>>) {
    spawn_with_writer(capacity, tokio::io::stdout())
}

/// Start the consumer writing to `writer`. The task resolves to the writer once every
/// [`LogHandle`] has been dropped and the queue has been drained.
pub fn spawn_with_writer<W>(
    capacity: usize,
    mut writer: W,
) -> (LogHandle, JoinHandle<std::io::Result<W>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
    let consumer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            writer.write_all(event.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok(writer)
    });
    (LogHandle { tx }, consumer)
}

/// UTC timestamp with millisecond precision, e.g. `2024-03-12T09:41:07.042Z`.
#[must_use]
pub fn timestamp(at: OffsetDateTime) -> String {
    at.format(&TIMESTAMP_FORMATTER).unwrap_or_default()
}

/// Render a human-readable dump of DNS wire bytes.
#[must_use]
pub fn format_dump(direction: Direction, peer: SocketAddr, wire: &[u8]) -> String {
    let body = match Message::from_vec(wire) {
        Ok(message) => message.to_string(),
        Err(err) => format!("error decoding DNS {}: {err}", direction.noun()),
    };
    format!(
        "[{}] ({peer}) {}:\n{body}",
        timestamp(OffsetDateTime::now_utc()),
        direction.label()
    )
}
