use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use bench_board::{BoardBuilder, FileStorage};
use cubesat_board::SystemServices;
use telemetry_node::{DeliveryOutcome, NetworkFault, NodeSettings, StorageSink, TelemetryLoop};
use tiny_http::{Response, Server};

/// Simulated clock so cycles do not sleep in real time.
#[derive(Default)]
struct FastSystem {
    millis: u64,
}

impl SystemServices for FastSystem {
    fn get_millis(&mut self) -> u64 {
        self.millis
    }

    fn epoch_timestamp(&mut self) -> i64 {
        1_700_000_000 + (self.millis / 1000) as i64
    }

    fn delay_ms(&mut self, ms: u32) {
        self.millis += ms as u64;
    }

    fn reset(&mut self) -> ! {
        panic!("hard reset");
    }
}

fn settings(json: serde_json::Value) -> NodeSettings {
    NodeSettings::from_json(&json.to_string()).unwrap()
}

fn node(
    settings: NodeSettings,
    bus_disconnected: bool,
) -> TelemetryLoop<
    bench_board::SimulatedBus,
    FileStorage,
    bench_board::HttpNetwork,
    bench_board::LogIndicator,
    FastSystem,
> {
    let board = BoardBuilder::new()
        .mount_path(&settings.mount_path)
        .bus_disconnected(bus_disconnected)
        .build();
    TelemetryLoop::new(
        settings,
        board.bus,
        board.storage,
        board.network,
        board.indicator,
        FastSystem::default(),
    )
}

fn persisted(settings: &NodeSettings) -> Vec<telemetry_node::TelemetryRecord> {
    let mut sink = StorageSink::new(FileStorage::new(&settings.mount_path), &settings.log_file_name);
    sink.mount().unwrap();
    sink.records().unwrap()
}

#[test]
fn offline_node_logs_every_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(serde_json::json!({ "mount_path": dir.path().join("sd").display().to_string() }));
    let mut node = node(settings.clone(), false);
    node.boot().unwrap();

    for _ in 0..3 {
        let report = node.run_cycle();
        assert!(report.persisted());
        assert!(report.delivery.is_none());
    }

    let records = persisted(&settings);
    assert_eq!(records.len(), 3);
    assert_eq!(
        records.iter().map(|r| r.sequence_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(records.iter().all(|r| r.team_id == 33 && r.temperature_c == Some(25.08)));
    assert!(dir.path().join("sd").join("telemetry.jsonl").is_file());
}

#[test]
fn linked_node_delivers_what_it_stores() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (sender, receiver) = mpsc::channel();
    let collector = thread::spawn(move || {
        for _ in 0..2 {
            let mut request = server.recv().unwrap();
            let mut body = String::new();
            request.as_reader().read_to_string(&mut body).unwrap();
            sender.send(body).unwrap();
            request.respond(Response::empty(200)).unwrap();
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(serde_json::json!({
        "mount_path": dir.path().display().to_string(),
        "enable_link": true,
        "ssid": "ground",
        "secret": "pw",
        "endpoint": format!("http://127.0.0.1:{port}/telemetry"),
    }));
    let mut node = node(settings.clone(), false);
    node.boot().unwrap();

    for _ in 0..2 {
        let report = node.run_cycle();
        assert_eq!(report.delivery, Some(DeliveryOutcome::Delivered { status: 200 }));
    }
    collector.join().unwrap();

    let delivered: Vec<_> = receiver
        .try_iter()
        .map(|body| telemetry_node::TelemetryRecord::from_json(&body).unwrap())
        .collect();
    assert_eq!(delivered, persisted(&settings));
}

#[test]
fn unreachable_collector_times_out_and_loop_continues() {
    let silent = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = silent.local_addr().unwrap().port();

    let dir = tempfile::tempdir().unwrap();
    let settings = settings(serde_json::json!({
        "mount_path": dir.path().display().to_string(),
        "enable_link": true,
        "ssid": "ground",
        "endpoint": format!("http://127.0.0.1:{port}/"),
        "send_timeout_ms": 300,
    }));
    let mut node = node(settings.clone(), false);
    node.boot().unwrap();

    let started = Instant::now();
    let report = node.run_cycle();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(report.delivery, Some(DeliveryOutcome::Failed(NetworkFault::Timeout)));
    assert!(report.persisted());

    let next = node.run_cycle();
    assert_eq!(next.sequence_number, 2);
    assert_eq!(node.stats().delivery_failures, 2);
    assert_eq!(persisted(&settings).len(), 2);
    drop(silent);
}

#[test]
fn disconnected_bus_still_produces_records() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(serde_json::json!({ "mount_path": dir.path().display().to_string() }));
    let mut node = node(settings.clone(), true);
    node.boot().unwrap();

    let report = node.run_cycle();
    assert_eq!(report.record.temperature_c, None);
    assert_eq!(report.record.battery_pct, None);
    assert_eq!(report.record.air_quality, None);

    let records = persisted(&settings);
    assert_eq!(records, vec![report.record]);
    let raw = std::fs::read_to_string(dir.path().join("telemetry.jsonl")).unwrap();
    assert!(raw.contains("\"temperature_c\":null"));
}

#[test]
fn torn_tail_from_previous_boot_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("telemetry.jsonl");
    std::fs::write(&log, b"{\"team_id\":33,\"seq").unwrap();

    let settings = settings(serde_json::json!({ "mount_path": dir.path().display().to_string() }));
    let mut node = node(settings.clone(), false);
    node.boot().unwrap();
    node.run_cycle();

    let raw = std::fs::read(&log).unwrap();
    assert!(raw.starts_with(b"{\"team_id\":33,\"seq\n{"));
    assert_eq!(persisted(&settings).len(), 1);
}
