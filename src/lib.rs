//! hostcrab
//!
//! A small UDP DNS responder that answers `A` queries from a static JSON hosts table and
//! transparently forwards everything else to a fixed upstream resolver.
//!
//! Each datagram is handled by its own task: decode, [look up][hosts::HostTable::lookup] or
//! [forward][dns::forwarder::Upstream], encode, and log to an [asynchronous queue][logger] that
//! a single consumer drains to standard output. On SIGINT/SIGTERM the listener stops reading and
//! every request already accepted runs to completion before the process exits; see
//! [`shutdown`].
//!
#![warn(clippy::pedantic)]

pub mod config;
pub mod dns;
pub mod error;
pub mod hosts;
pub mod logger;
pub mod shutdown;

pub use config::Config;
pub use dns::handlers::Handler;
pub use dns::new as new_dns;
pub use dns::server::Server;
pub use hosts::HostTable;
pub use shutdown::ShutdownCoordinator;
