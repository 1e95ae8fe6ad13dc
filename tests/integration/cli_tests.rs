//! Runs of the `procbench` binary

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn write_case(dir: &Path, name: &str, case: Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, case.to_string()).unwrap();
    path
}

fn procbench() -> Command {
    Command::new(env!("CARGO_BIN_EXE_procbench"))
}

fn read_output(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_cli_writes_all_results() {
    let dir = tempfile::tempdir().unwrap();
    let quick = write_case(
        dir.path(),
        "quick.json",
        json!({"id": "quick", "command": ["true"], "timeout_sec": 5}),
    );
    let exits = write_case(
        dir.path(),
        "exits.json",
        json!({
            "id": "exits",
            "command": ["sh", "-c", "test \"$GREETING\" = hi && exit 7"],
            "env": {"GREETING": "hi"},
            "sampling_interval_ms": 50
        }),
    );
    let out = dir.path().join("out").join("results.json");

    let status = procbench()
        .arg(&quick)
        .arg(&exits)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let doc = read_output(&out);
    assert_eq!(doc["schema_version"], "1.0");
    let results = doc["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["testcase"]["id"], "quick");
    assert_eq!(results[0]["summary"]["status"], "completed");
    assert_eq!(results[1]["process_info"]["exit_code"], 7);
    assert!(doc["session"]["end_time"].as_f64() >= doc["session"]["start_time"].as_f64());
}

#[test]
fn test_cli_continue_and_stop_on_error() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write_case(
        dir.path(),
        "broken.json",
        json!({"id": "broken", "command": ["/definitely/not/a/real/binary"]}),
    );
    let fine = write_case(
        dir.path(),
        "fine.json",
        json!({"id": "fine", "command": ["true"]}),
    );

    let out = dir.path().join("continue.json");
    let status = procbench()
        .args([&broken, &fine])
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(!status.success());
    assert_eq!(read_output(&out)["results"].as_array().unwrap().len(), 1);

    let out = dir.path().join("stop.json");
    let status = procbench()
        .args([&broken, &fine])
        .arg("--stop-on-error")
        .arg("--output")
        .arg(&out)
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(read_output(&out)["results"].as_array().unwrap().is_empty());
}
