mod logging;
pub use logging::setup_logging;
pub mod cache;
pub use cache::{CacheKey, CacheValue, KeyKind, Store};
mod config;
pub use config::{Config, ConfigError, Endpoint};
mod dispatcher;
pub use dispatcher::{Dispatcher, QueryKind, SupportedType};
mod upstream;
pub use upstream::{Forwarded, Forwarder, Upstream, FORWARDER_TIMEOUT};
mod server;
pub use server::{DnsServer, RECV_TIMEOUT};
mod cli;
pub use cli::Args;
mod app;
pub use app::App;
mod util;

/// Receive buffer of the listener, the recommended eDNS buf size
pub const UDP_BUF_CAPACITY: usize = 1232;
