use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use prometheus::core::Collector;
use tcp_state_exporter::socket::procfs::parse_table;
use tcp_state_exporter::{
    CollectorConfig, ReadError, SocketRecord, SocketTableReader, StaticLabels, TcpStateCollector,
};

const ROWS: u32 = 10_000;

struct FixedTable(Vec<SocketRecord>);

impl SocketTableReader for FixedTable {
    fn read(&self) -> Result<Vec<SocketRecord>, ReadError> {
        Ok(self.0.clone())
    }
}

fn records() -> Vec<SocketRecord> {
    (0..ROWS)
        .map(|i| {
            let local = SocketAddr::from((Ipv4Addr::new(10, 0, 0, 1), 1024 + (i % 64) as u16));
            let remote =
                SocketAddr::from((Ipv4Addr::new(172, 16, (i % 8) as u8, (i % 250) as u8), 443));
            SocketRecord::new(local, remote, (i % 12) as u8)
        })
        .collect()
}

fn proc_net_tcp() -> String {
    let mut content = String::from(
        "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n",
    );
    for (i, r) in records().iter().enumerate() {
        let (SocketAddr::V4(local), SocketAddr::V4(remote)) = (r.local, r.remote) else {
            continue;
        };
        content.push_str(&format!(
            "{i:4}: {:08X}:{:04X} {:08X}:{:04X} {:02X} 00000000:00000000 00:00000000 00000000     0        0 {i} 1 0000000000000000 100 0 0 10 0\n",
            u32::from_ne_bytes(local.ip().octets()),
            local.port(),
            u32::from_ne_bytes(remote.ip().octets()),
            remote.port(),
            r.state_code,
        ));
    }
    content
}

fn bench_parse(c: &mut Criterion) {
    let content = proc_net_tcp();
    c.bench_function("parse_proc_net_tcp_10k", |b| {
        b.iter(|| parse_table(Path::new("tcp"), black_box(&content)))
    });
}

fn bench_collect(c: &mut Criterion) {
    let labels = StaticLabels::from_vars(vec![("L_env", "bench")], "L_");
    let collector = TcpStateCollector::new(
        FixedTable(records()),
        &CollectorConfig::default(),
        labels,
    )
    .expect("valid collector");

    c.bench_function("collect_10k_records", |b| {
        b.iter(|| black_box(collector.collect()))
    });
}

criterion_group!(benches, bench_parse, bench_collect);
criterion_main!(benches);
