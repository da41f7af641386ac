use std::path::Path;
use std::process::{Command, Output};

fn cubesat(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cubesat"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn write_settings(dir: &Path, settings: serde_json::Value) -> String {
    let path = dir.join("settings.json");
    std::fs::write(&path, settings.to_string()).unwrap();
    path.display().to_string()
}

fn records(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[test]
fn run_then_read_then_clear() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("sd");
    let settings = write_settings(
        dir.path(),
        serde_json::json!({ "mount_path": card.display().to_string(), "team_id": 7 }),
    );

    let run = cubesat(&["run", "--settings", &settings, "--cycles", "2"]);
    assert!(run.status.success(), "{:?}", run);

    let read = cubesat(&["read", "--settings", &settings]);
    assert!(read.status.success());
    let printed = records(&read.stdout);
    assert_eq!(printed.len(), 2);
    assert_eq!(printed[0]["sequence_number"], 1);
    assert_eq!(printed[1]["sequence_number"], 2);
    assert_eq!(printed[1]["team_id"], 7);

    let clear = cubesat(&["clear", "--settings", &settings]);
    assert!(clear.status.success());
    assert!(String::from_utf8_lossy(&clear.stdout).contains("removed 1 file(s)"));

    let read = cubesat(&["read", "--settings", &settings]);
    assert!(records(&read.stdout).is_empty());
}

#[test]
fn disconnected_bus_runs_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let settings = write_settings(
        dir.path(),
        serde_json::json!({ "mount_path": dir.path().join("sd").display().to_string() }),
    );

    let run = cubesat(&["run", "--settings", &settings, "--cycles", "1", "--bus-disconnected"]);
    assert!(run.status.success(), "{:?}", run);

    let printed = records(&cubesat(&["read", "--settings", &settings]).stdout);
    assert_eq!(printed.len(), 1);
    assert!(printed[0]["temperature_c"].is_null());
    assert!(printed[0].get("air_quality").is_none());
}

#[test]
fn invalid_settings_fail_boot() {
    let dir = tempfile::tempdir().unwrap();
    let settings = write_settings(
        dir.path(),
        serde_json::json!({
            "mount_path": dir.path().display().to_string(),
            "enable_link": true,
            "endpoint": "http://127.0.0.1:9/",
        }),
    );

    let run = cubesat(&["run", "--settings", &settings, "--cycles", "1"]);
    assert_eq!(run.status.code(), Some(2));
}

#[test]
fn unmountable_storage_fails_boot() {
    let dir = tempfile::tempdir().unwrap();
    let card = dir.path().join("card");
    std::fs::write(&card, b"not a directory").unwrap();
    let settings = write_settings(
        dir.path(),
        serde_json::json!({ "mount_path": card.display().to_string() }),
    );

    let run = cubesat(&["run", "--settings", &settings, "--cycles", "1"]);
    assert_eq!(run.status.code(), Some(2));
}

#[test]
fn missing_settings_file_is_an_error() {
    let run = cubesat(&["read", "--settings", "/nonexistent/settings.json"]);
    assert!(!run.status.success());
}

#[test]
fn reset_exits_for_the_supervisor() {
    let dir = tempfile::tempdir().unwrap();
    let settings = write_settings(
        dir.path(),
        serde_json::json!({ "mount_path": dir.path().display().to_string() }),
    );

    let reset = cubesat(&["reset", "--settings", &settings]);
    assert_eq!(reset.status.code(), Some(bench_board::RESET_EXIT_CODE));
}
