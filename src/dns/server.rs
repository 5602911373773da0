use crate::config::Config;
use crate::dns::handlers::Handler;
use crate::dns::pool::BufferPool;
use crate::dns::InboundDatagram;
use crate::error::Error;
use crate::shutdown::ShutdownCoordinator;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

/// The dispatcher: sole reader of the listening socket, spawning one worker per datagram.
pub struct Server {
    socket: Arc<UdpSocket>,
    handler: Handler,
    pool: BufferPool,
    admission: Option<Arc<Semaphore>>,
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Bind`] if the socket can't be bound.
    pub async fn bind(
        config: &Config,
        handler: Handler,
        shutdown: &ShutdownCoordinator,
    ) -> Result<Self, Error> {
        let addr = config.dns_udp_bind_addr;
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })?;
        Ok(Server {
            socket: Arc::new(socket),
            handler,
            pool: BufferPool::new(config.buffer_pool_capacity, config.read_buffer_size),
            admission: config
                .max_in_flight
                .map(|limit| Arc::new(Semaphore::new(limit))),
            token: shutdown.token(),
            tracker: shutdown.tracker(),
        })
    }

    /// # Errors
    ///
    /// Returns an IO error if the socket's address can't be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Read datagrams until the shutdown token is cancelled.
    ///
    /// Workers are spawned on the shutdown tracker and are not awaited here; the listening
    /// socket is released once the last of them finishes.
    pub async fn block_until_done(self) {
        loop {
            let mut buffer = self.pool.acquire();
            let received = tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                received = self.socket.recv_from(&mut buffer) => received,
            };

            let (len, peer) = match received {
                Ok(r) => r,
                Err(_) if self.token.is_cancelled() => break,
                Err(err) => {
                    error!("Error reading data: {err}");
                    continue;
                }
            };

            let payload = buffer.copy_out(len);
            let Some(datagram) = InboundDatagram::new(payload, peer) else {
                debug!("dropping {len} byte datagram from {peer}: too short for a DNS header");
                continue;
            };

            let permit = match &self.admission {
                None => None,
                Some(semaphore) => match semaphore.clone().acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
            };

            self.tracker.spawn(worker(
                self.socket.clone(),
                self.handler.clone(),
                datagram,
                permit,
            ));
        }
        info!("DNS listener stopped");
    }
}

async fn worker(
    socket: Arc<UdpSocket>,
    handler: Handler,
    datagram: InboundDatagram,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let Some(response) = handler.handle_datagram(&datagram).await else {
        return;
    };
    if let Err(err) = socket.send_to(&response, datagram.peer).await {
        handler
            .log()
            .push(format!("Error sending response: {err}"))
            .await;
    }
}
