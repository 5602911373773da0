use crate::dns::pool::DEFAULT_POOL_CAPACITY;
use crate::error::Error;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::PathBuf;
use std::time::Duration;

/// Fixed location of the hosts table, relative to the working directory.
pub const DEFAULT_HOSTS_PATH: &str = "hosts.json";

/// Environment variable that caps the number of requests handled concurrently.
pub const MAX_IN_FLIGHT_ENV: &str = "HOSTCRAB_MAX_IN_FLIGHT";

#[derive(Debug, Clone)]
pub struct Config {
    pub hosts_path: PathBuf,
    pub dns_udp_bind_addr: SocketAddr,
    pub upstream_addr: SocketAddr,
    pub upstream_timeout: Duration,
    pub read_buffer_size: usize,
    /// Idle receive buffers kept for reuse; released buffers beyond this are dropped.
    pub buffer_pool_capacity: usize,
    pub log_queue_capacity: usize,
    /// Admission control for request workers. `None` spawns one worker per datagram with no
    /// ceiling.
    pub max_in_flight: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            hosts_path: PathBuf::from(DEFAULT_HOSTS_PATH),
            dns_udp_bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 53)),
            upstream_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(1, 1, 1, 1), 53)),
            upstream_timeout: Duration::from_secs(2),
            read_buffer_size: 1024,
            buffer_pool_capacity: DEFAULT_POOL_CAPACITY,
            log_queue_capacity: 1024,
            max_in_flight: None,
        }
    }
}

impl Config {
    /// Build the default configuration, applying the [`MAX_IN_FLIGHT_ENV`] override when set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if the override isn't a positive integer.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Config::default();
        if let Ok(value) = std::env::var(MAX_IN_FLIGHT_ENV) {
            config.max_in_flight = Some(parse_max_in_flight(&value)?);
        }
        Ok(config)
    }
}

fn parse_max_in_flight(value: &str) -> Result<usize, Error> {
    match value.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit),
        _ => Err(Error::InvalidSetting {
            name: MAX_IN_FLIGHT_ENV,
            value: value.to_string(),
        }),
    }
}
