//! Binary-level behavior: exit codes, artifacts on disk, reports, console output.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

const CSV: &str = "id_proyecto;proyecto;vida;valorinversion;Tipo\n\
p1;g1;75;1000;Puente\n\
p2;g2;75;1000;Via\n\
p3;g3;75;1000;Muro\n";

fn psel() -> Command {
    let mut cmd = Command::cargo_bin("psel").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_manifest(dir: &Path, params: Value) -> std::path::PathBuf {
    fs::write(dir.join("candidates.csv"), CSV).unwrap();
    let m = dir.join("run.json");
    fs::write(&m, json!({ "candidates_path": "candidates.csv", "params": params }).to_string()).unwrap();
    m
}

fn base_params() -> Value {
    json!({ "baseline_life": 70, "budget": 2500, "scale": 1, "top_n": 5 })
}

#[test]
fn manifest_run_writes_artifacts_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_manifest(dir.path(), base_params());
    let out = dir.path().join("out");

    psel()
        .arg("--manifest")
        .arg(&m)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("== Optimal allocation =="))
        .stdout(predicate::str::contains("members:     p1, p2"))
        .stdout(predicate::str::contains("-- rank 5 details --"));

    let result: Value = serde_json::from_slice(&fs::read(out.join("result.json")).unwrap()).unwrap();
    let run: Value = serde_json::from_slice(&fs::read(out.join("run_record.json")).unwrap()).unwrap();
    assert_eq!(result["optimal"]["member_ids"], json!(["p1", "p2"]));
    assert_eq!(run["outputs"]["result_id"], result["id"]);
    assert_eq!(run["timestamp_utc"], "1970-01-01T00:00:00Z");
}

#[test]
fn reruns_produce_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_manifest(dir.path(), base_params());
    let (a, b) = (dir.path().join("a"), dir.path().join("b"));
    for out in [&a, &b] {
        psel().arg("--manifest").arg(&m).arg("--out").arg(out).arg("-q").assert().success();
    }
    for f in ["result.json", "run_record.json"] {
        assert_eq!(fs::read(a.join(f)).unwrap(), fs::read(b.join(f)).unwrap(), "{f}");
    }
}

#[test]
fn explicit_mode_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let c = dir.path().join("c.csv");
    fs::write(&c, CSV.replace(';', ",")).unwrap();
    let out = dir.path().join("out");

    psel()
        .args(["--candidates", c.to_str().unwrap(), "--delimiter", ","])
        .args(["--baseline", "70", "--budget", "1000", "--scale", "1", "--top-n", "2"])
        .args(["--display-col", "Tipo", "--timestamp", "2025-08-12T10:00:00Z"])
        .args(["--render", "json", "html", "csv", "-q"])
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    for f in ["report.json", "report.html", "ranked_summary.csv", "optimal_details.csv", "rank_1_details.csv"] {
        assert!(out.join(f).is_file(), "{f} missing");
    }
    let run: Value = serde_json::from_slice(&fs::read(out.join("run_record.json")).unwrap()).unwrap();
    assert!(run["id"].as_str().unwrap().starts_with("RUN:2025-08-12T10:00:00Z:"));
    let summary = fs::read_to_string(out.join("ranked_summary.csv")).unwrap();
    assert!(summary.starts_with("rank;delta_total;cost_total;life_total;ratio;member_ids\n1;5.00;1000.00;75.00;"));
}

#[test]
fn explicit_mode_needs_every_parameter() {
    let dir = tempfile::tempdir().unwrap();
    let c = dir.path().join("c.csv");
    fs::write(&c, CSV).unwrap();
    psel()
        .args(["--candidates", c.to_str().unwrap(), "--baseline", "70", "--budget", "10", "--scale", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--top-n"));
}

#[test]
fn validate_only_prints_findings() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_manifest(dir.path(), json!({ "baseline_life": 70, "budget": 10, "scale": 1, "top_n": 1 }));
    psel()
        .arg("--manifest")
        .arg(&m)
        .arg("--validate-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Budget.Infeasible"));
    assert!(!dir.path().join("result.json").exists());
}

#[test]
fn exit_codes_by_failure_kind() {
    let dir = tempfile::tempdir().unwrap();

    // Unknown manifest field: validation.
    fs::write(dir.path().join("candidates.csv"), CSV).unwrap();
    let m = dir.path().join("bad.json");
    fs::write(&m, json!({ "candidates_path": "candidates.csv", "params": base_params(), "seed": 1 }).to_string())
        .unwrap();
    psel().arg("--manifest").arg(&m).assert().code(2);

    // Digest mismatch: self-verify.
    let m = dir.path().join("digest.json");
    let body = json!({
        "candidates_path": "candidates.csv",
        "params": base_params(),
        "expect": { "input_sha256": "0".repeat(64) }
    });
    fs::write(&m, body.to_string()).unwrap();
    psel().arg("--manifest").arg(&m).assert().code(3);

    // Budget axis too large: domain.
    let m = write_manifest(dir.path(), json!({ "baseline_life": 70, "budget": 1e9, "scale": 1000, "top_n": 1 }));
    psel().arg("--manifest").arg(&m).assert().code(5);

    // Manifest names a missing candidate file: I/O.
    let m = dir.path().join("missing.json");
    fs::write(&m, json!({ "candidates_path": "nope.csv", "params": base_params() }).to_string()).unwrap();
    psel().arg("--manifest").arg(&m).assert().code(4);
}

#[test]
fn remote_paths_are_refused() {
    psel()
        .args(["--manifest", "https://example.org/run.json"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no scheme"));
}
