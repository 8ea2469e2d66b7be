//! `/proc/net/tcp` and `/proc/net/tcp6` parsing.
//!
//! Each row looks like:
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    0: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 41216
//! ```
//!
//! Addresses are printed as 32-bit words in host byte order (one word for
//! IPv4, four for IPv6), ports as big-endian hex, and the state as a hex byte.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ReadError, SocketRecord, SocketTableReader};

/// Reads the TCP socket table from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcNetTcpReader {
    proc_root: PathBuf,
    include_ipv6: bool,
}

impl ProcNetTcpReader {
    /// Creates a reader rooted at `proc_root` (normally `/proc`).
    pub fn new(proc_root: impl Into<PathBuf>, include_ipv6: bool) -> Self {
        Self {
            proc_root: proc_root.into(),
            include_ipv6,
        }
    }

    /// Verifies the IPv4 table is readable. Used once at startup.
    pub fn probe(&self) -> Result<(), ReadError> {
        let path = self.table_path("tcp");
        std::fs::read_to_string(&path)
            .map(|_| ())
            .map_err(|source| ReadError::Io { path, source })
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.proc_root.join("net").join(name)
    }

    fn tables(&self) -> Vec<PathBuf> {
        let mut tables = vec![self.table_path("tcp")];
        if self.include_ipv6 {
            tables.push(self.table_path("tcp6"));
        }
        tables
    }
}

impl SocketTableReader for ProcNetTcpReader {
    fn read(&self) -> Result<Vec<SocketRecord>, ReadError> {
        let mut records = Vec::with_capacity(256);
        let mut first_err: Option<ReadError> = None;

        for path in self.tables() {
            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(source) => {
                    first_err.get_or_insert(ReadError::Io { path, source });
                    continue;
                }
            };

            let (parsed, errors) = parse_table(&path, &content);
            records.extend(parsed);

            for err in errors {
                debug!(error = %err, "skipping socket table row");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            None => Ok(records),
            Some(err) if records.is_empty() => Err(err),
            Some(err) => Err(ReadError::Partial {
                records,
                source: Box::new(err),
            }),
        }
    }
}

/// Parses the contents of one table file, skipping the header row.
///
/// Malformed rows are returned as errors alongside the rows that parsed.
pub fn parse_table(path: &Path, content: &str) -> (Vec<SocketRecord>, Vec<ReadError>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        match parse_row(line) {
            Ok(record) => records.push(record),
            Err(reason) => errors.push(ReadError::Parse {
                path: path.to_path_buf(),
                line: idx + 1,
                reason,
            }),
        }
    }

    (records, errors)
}

fn parse_row(line: &str) -> Result<SocketRecord, String> {
    let mut fields = line.split_whitespace();

    let _slot = fields.next().ok_or("empty row")?;
    let local = fields.next().ok_or("missing local_address column")?;
    let remote = fields.next().ok_or("missing rem_address column")?;
    let state = fields.next().ok_or("missing st column")?;

    let state_code =
        u8::from_str_radix(state, 16).map_err(|e| format!("invalid state {state:?}: {e}"))?;

    Ok(SocketRecord {
        local: parse_socket_addr(local)?,
        remote: parse_socket_addr(remote)?,
        state_code,
    })
}

fn parse_socket_addr(s: &str) -> Result<SocketAddr, String> {
    let (ip_hex, port_hex) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid address {s:?}: missing port"))?;

    let port =
        u16::from_str_radix(port_hex, 16).map_err(|e| format!("invalid port {port_hex:?}: {e}"))?;

    Ok(SocketAddr::new(parse_ip(ip_hex)?, port))
}

fn parse_ip(hex: &str) -> Result<IpAddr, String> {
    if !hex.is_ascii() {
        return Err(format!("invalid address {hex:?}: not hex"));
    }

    match hex.len() {
        8 => {
            let word = parse_word(hex)?;
            Ok(IpAddr::V4(Ipv4Addr::from(word.to_ne_bytes())))
        }
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_exact_mut(4).enumerate() {
                let word = parse_word(&hex[i * 8..i * 8 + 8])?;
                chunk.copy_from_slice(&word.to_ne_bytes());
            }
            Ok(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        len => Err(format!("invalid address {hex:?}: unexpected length {len}")),
    }
}

fn parse_word(hex: &str) -> Result<u32, String> {
    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid address word {hex:?}: {e}"))
}
