//! Prometheus exporter for the host TCP socket table.
//!
//! ```text
//! HTTP GET /metrics
//!   └── Registry::gather()
//!         └── TcpStateCollector::collect()
//!               ├── SocketTableReader::read()   (/proc/net/tcp{,6})
//!               └── tcp_connections / tcp_listening_ports gauges
//! ```

pub mod collector;
pub mod config;
pub mod export;
pub mod labels;
pub mod socket;

pub use collector::TcpStateCollector;
pub use config::{CollectorConfig, Config};
pub use export::MetricsServer;
pub use labels::StaticLabels;
pub use socket::{ProcNetTcpReader, ReadError, SocketRecord, SocketTableReader, TcpState};
