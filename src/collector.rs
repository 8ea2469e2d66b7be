//! Prometheus collector turning the TCP socket table into gauges.
//!
//! Every scrape rebuilds both families from zero: the connection set is
//! dynamic, so label combinations of closed sockets must not survive into
//! the next scrape.

use anyhow::Result;
use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, IntCounter, Opts};
use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::labels::StaticLabels;
use crate::socket::{SocketRecord, SocketTableReader, TcpState};

/// Built-in labels of the connections family, in order.
pub const CONNECTION_LABELS: &[&str] = &["state", "remote_address", "remote_port"];

/// Built-in labels of the listening ports family, in order.
pub const LISTENING_LABELS: &[&str] = &["local_address", "local_port"];

/// Aggregates socket records into `tcp_connections` and `tcp_listening_ports`.
pub struct TcpStateCollector {
    reader: Box<dyn SocketTableReader>,
    labels: StaticLabels,
    connections: GaugeVec,
    listening: GaugeVec,
    read_errors: IntCounter,
    /// Serializes reset + repopulate + collect across concurrent scrapes.
    scrape_lock: Mutex<()>,
}

impl TcpStateCollector {
    /// Creates a collector whose label keys are fixed by `labels` for its lifetime.
    pub fn new<R>(reader: R, cfg: &CollectorConfig, labels: StaticLabels) -> Result<Self>
    where
        R: SocketTableReader + 'static,
    {
        let connection_labels: Vec<&str> = CONNECTION_LABELS
            .iter()
            .copied()
            .chain(labels.keys())
            .collect();
        let listening_labels: Vec<&str> = LISTENING_LABELS
            .iter()
            .copied()
            .chain(labels.keys())
            .collect();

        let connections = GaugeVec::new(
            Opts::new(
                cfg.connections_name(),
                "Current number of TCP connections by state and remote address",
            ),
            &connection_labels,
        )?;
        let listening = GaugeVec::new(
            Opts::new(
                cfg.listening_name(),
                "Current number of TCP listening ports by local address",
            ),
            &listening_labels,
        )?;
        let read_errors = IntCounter::with_opts(
            Opts::new(
                "socket_read_errors_total",
                "Total scrapes in which the TCP socket table could not be fully read.",
            )
            .namespace("tcp_exporter"),
        )?;

        Ok(Self {
            reader: Box::new(reader),
            labels,
            connections,
            listening,
            read_errors,
            scrape_lock: Mutex::new(()),
        })
    }

    fn observe(&self, record: &SocketRecord) {
        let state = record.state();

        if state == TcpState::Listen {
            let address = record.local_address();
            let port = record.local.port().to_string();
            self.listening
                .with_label_values(&self.label_values(&[address.as_str(), port.as_str()]))
                .inc();
        } else {
            let address = record.remote_address();
            let port = record.remote.port().to_string();
            self.connections
                .with_label_values(&self.label_values(&[
                    state.as_str(),
                    address.as_str(),
                    port.as_str(),
                ]))
                .inc();
        }
    }

    /// Built-in values followed by the static label values, matching key order.
    fn label_values<'a>(&'a self, builtin: &[&'a str]) -> Vec<&'a str> {
        builtin
            .iter()
            .copied()
            .chain(self.labels.values())
            .collect()
    }
}

impl Collector for TcpStateCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.connections.desc();
        descs.extend(self.listening.desc());
        descs.extend(self.read_errors.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let _guard = self.scrape_lock.lock();

        self.connections.reset();
        self.listening.reset();

        let records = match self.reader.read() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "reading TCP socket table");
                self.read_errors.inc();
                e.into_records()
            }
        };

        for record in &records {
            self.observe(record);
        }

        let mut families = self.connections.collect();
        families.extend(self.listening.collect());
        families.extend(self.read_errors.collect());

        debug!(
            records = records.len(),
            samples = families.iter().map(|mf| mf.get_metric().len()).sum::<usize>(),
            "collected TCP socket table",
        );

        families
    }
}
