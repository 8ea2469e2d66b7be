//! TCP socket table access.
//!
//! [`SocketTableReader`] is the seam between the collector and the host:
//! production code reads `/proc/net/tcp{,6}` through [`ProcNetTcpReader`],
//! tests substitute a fixed table.

pub mod procfs;
pub mod state;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

pub use procfs::ProcNetTcpReader;
pub use state::TcpState;

/// One entry of the kernel's live TCP connection table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketRecord {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    /// Raw kernel state code (`st` column).
    pub state_code: u8,
}

impl SocketRecord {
    pub fn new(local: SocketAddr, remote: SocketAddr, state_code: u8) -> Self {
        Self {
            local,
            remote,
            state_code,
        }
    }

    pub fn state(&self) -> TcpState {
        TcpState::from_code(i64::from(self.state_code))
    }

    /// Canonical textual form of the local address.
    pub fn local_address(&self) -> String {
        canonical_ip(self.local.ip())
    }

    /// Canonical textual form of the remote address.
    pub fn remote_address(&self) -> String {
        canonical_ip(self.remote.ip())
    }
}

/// IPv4-mapped IPv6 addresses render as dotted IPv4.
fn canonical_ip(ip: IpAddr) -> String {
    ip.to_canonical().to_string()
}

/// Errors returned while reading the socket table.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {} line {line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Some records were read before a failure.
    #[error("partial socket table ({} records): {source}", .records.len())]
    Partial {
        records: Vec<SocketRecord>,
        #[source]
        source: Box<ReadError>,
    },
}

impl ReadError {
    /// Returns the records salvaged from a failed read, if any.
    pub fn into_records(self) -> Vec<SocketRecord> {
        match self {
            Self::Partial { records, .. } => records,
            Self::Io { .. } | Self::Parse { .. } => Vec::new(),
        }
    }
}

/// Source of TCP socket records.
///
/// Implementations hold no state between calls; each `read` reflects the
/// table at the time of the call.
pub trait SocketTableReader: Send + Sync {
    fn read(&self) -> Result<Vec<SocketRecord>, ReadError>;
}
