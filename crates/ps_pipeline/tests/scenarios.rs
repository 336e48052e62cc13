//! End-to-end pipeline runs over files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use ps_io::canonical_json::to_canonical_bytes;
use ps_io::hasher::sha256_hex;
use ps_pipeline::{ctx_from_manifest_path, run_from_manifest_path, run_with_ctx, validate_only, PipelineError};
use serde_json::{json, Value};

const HEADER: &str = "id_proyecto;proyecto;vida;valorinversion;Tipo";

fn write_case(dir: &Path, rows: &[&str], params: Value) -> PathBuf {
    let mut csv = String::from(HEADER);
    for r in rows {
        csv.push('\n');
        csv.push_str(r);
    }
    csv.push('\n');
    fs::write(dir.join("candidates.csv"), csv).unwrap();
    let manifest = json!({ "candidates_path": "candidates.csv", "params": params });
    let path = dir.join("run.json");
    fs::write(&path, manifest.to_string()).unwrap();
    path
}

fn params(baseline: f64, budget: f64, top_n: usize) -> Value {
    json!({ "baseline_life": baseline, "budget": budget, "scale": 1, "top_n": top_n })
}

#[test]
fn scenario_a_three_groups_budget_fits_two() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(
        dir.path(),
        &["p1;g1;75;1000;Puente", "p2;g2;75;1000;Via", "p3;g3;75;1000;Muro"],
        params(70.0, 2500.0, 5),
    );
    let out = run_from_manifest_path(&m).unwrap();
    let opt = &out.result.optimal;
    assert_eq!(opt.member_ids, vec!["p1", "p2"]);
    assert_eq!(opt.cost_total, 2000.0);
    assert_eq!(opt.delta_total, 10.0);
    assert_eq!(opt.details.len(), 2);
    assert_eq!(opt.details[0].attributes, vec![("Tipo".to_string(), "Puente".to_string())]);

    // Ranked: three pairs first, then the three singles.
    let ranked = &out.result.ranked;
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0].allocation.member_ids, vec!["p1", "p2"]);
    assert_eq!(ranked[1].allocation.member_ids, vec!["p1", "p3"]);
    assert_eq!(ranked[2].allocation.member_ids, vec!["p2", "p3"]);
    assert_eq!(ranked[3].allocation.member_ids, vec!["p1"]);
    assert!(!out.result.truncated);
}

#[test]
fn scenario_b_one_per_group() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["x1;g;73;500;a", "x2;g;80;2000;b"], params(70.0, 2000.0, 5));
    let out = run_from_manifest_path(&m).unwrap();
    assert_eq!(out.result.optimal.member_ids, vec!["x2"]);
    for r in &out.result.ranked {
        assert!(r.allocation.member_ids.len() <= 1);
    }
}

#[test]
fn scenario_c_zero_budget_gives_empty_allocation() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["x1;g;73;500;a"], params(70.0, 0.0, 3));
    let out = run_from_manifest_path(&m).unwrap();
    let opt = &out.result.optimal;
    assert!(opt.member_ids.is_empty());
    assert_eq!(opt.delta_total, 0.0);
    assert_eq!(opt.cost_total, 0.0);
    let codes: Vec<&str> = out.result.issues.iter().map(|i| i.code.as_str()).collect();
    assert!(codes.contains(&"Budget.Infeasible"), "{codes:?}");
}

#[test]
fn scenario_d_fewer_allocations_than_requested() {
    let dir = tempfile::tempdir().unwrap();
    // {}, {a}, {b}: a and b cannot both fit.
    let m = write_case(dir.path(), &["a;g1;75;60;x", "b;g2;74;60;y"], params(70.0, 100.0, 5));
    let out = run_from_manifest_path(&m).unwrap();
    assert_eq!(out.result.ranked.len(), 3);
    assert!(out.result.ranked[2].allocation.member_ids.is_empty());
}

#[test]
fn scenario_e_zero_delta_spending_ranks_higher() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["a;g1;75;10;x", "z;g2;70;5;y"], params(70.0, 100.0, 5));
    let out = run_from_manifest_path(&m).unwrap();
    assert_eq!(out.result.optimal.member_ids, vec!["a", "z"]);
    assert_eq!(out.result.ranked[0].allocation.member_ids, vec!["a", "z"]);
    assert_eq!(out.result.ranked[1].allocation.member_ids, vec!["a"]);
}

#[test]
fn reruns_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(
        dir.path(),
        &["p1;g1;75;10;a", "p2;g1;77;30;b", "p3;g2;71;5;c", "p4;g3;74,5;12;d"],
        params(72.0, 40.0, 10),
    );
    let a = run_from_manifest_path(&m).unwrap();
    let b = run_from_manifest_path(&m).unwrap();
    assert_eq!(to_canonical_bytes(&a.result).unwrap(), to_canonical_bytes(&b.result).unwrap());
    assert_eq!(a.run_record.id, b.run_record.id);
    assert_eq!(a.run_record.timestamp_utc, "1970-01-01T00:00:00Z");

    let input = fs::read(dir.path().join("candidates.csv")).unwrap();
    assert_eq!(a.run_record.inputs.input_sha256, sha256_hex(&input));
    assert_eq!(a.run_record.outputs.result_id, a.result.id);
}

#[test]
fn timestamp_changes_run_id_only() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["p1;g1;75;10;a"], params(72.0, 40.0, 2));
    let base = run_from_manifest_path(&m).unwrap();
    let mut ctx = ctx_from_manifest_path(&m).unwrap();
    ctx.timestamp = "2025-08-12T10:00:00Z".into();
    let later = run_with_ctx(ctx).unwrap();
    assert_eq!(base.result.id, later.result.id);
    assert_ne!(base.run_record.id, later.run_record.id);
    assert!(later.run_record.id.starts_with("RUN:2025-08-12T10:00:00Z:"));
}

#[test]
fn row_findings_flow_into_result() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["p1;g1;abc;10;a", ";g2;75;1;b", "p3;g3;75;-4;c"], params(70.0, 40.0, 2));
    let out = run_from_manifest_path(&m).unwrap();
    let codes: Vec<&str> = out.result.issues.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(&codes[..3], &["Row.ValueCoerced", "Row.MissingId", "Row.NegativeCost"]);
    assert_eq!(out.result.candidates, 2);
    assert_eq!(out.run_record.inputs.rows_read, 3);
}

#[test]
fn step_cap_marks_truncation() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<String> = (0..8).map(|i| format!("p{i};g{i};75;1;x")).collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let m = write_case(
        dir.path(),
        &rows,
        json!({ "baseline_life": 70, "budget": 100, "scale": 1, "top_n": 3, "max_steps": 10 }),
    );
    let out = run_from_manifest_path(&m).unwrap();
    assert!(out.result.truncated);
    assert_eq!(out.result.steps, 10);
    assert!(out.result.issues.iter().any(|i| i.code == "Search.Truncated"));
    // The optimum is exact regardless of the cap.
    assert_eq!(out.result.optimal.member_ids.len(), 8);
}

#[test]
fn digest_expectation_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["p1;g1;75;10;a"], params(72.0, 40.0, 2));
    let mut man: Value = serde_json::from_slice(&fs::read(&m).unwrap()).unwrap();

    man["expect"] = json!({ "input_sha256": "0".repeat(64) });
    fs::write(&m, man.to_string()).unwrap();
    assert!(matches!(run_from_manifest_path(&m), Err(PipelineError::Verify(_))));

    let good = sha256_hex(&fs::read(dir.path().join("candidates.csv")).unwrap());
    man["expect"] = json!({ "input_sha256": good });
    fs::write(&m, man.to_string()).unwrap();
    assert!(run_from_manifest_path(&m).is_ok());
}

#[test]
fn structural_failures_are_bucketed() {
    let dir = tempfile::tempdir().unwrap();

    // Missing cost column.
    fs::write(dir.path().join("candidates.csv"), "id_proyecto;proyecto;vida\na;g;70\n").unwrap();
    let m = dir.path().join("run.json");
    fs::write(&m, json!({ "candidates_path": "candidates.csv", "params": params(70.0, 1.0, 1) }).to_string()).unwrap();
    match run_from_manifest_path(&m) {
        Err(PipelineError::Schema(msg)) => assert!(msg.contains("cost"), "{msg}"),
        other => panic!("unexpected {other:?}"),
    }

    // Header only.
    let m = write_case(dir.path(), &[], params(70.0, 1.0, 1));
    assert!(matches!(run_from_manifest_path(&m), Err(PipelineError::Validate(_))));

    // Budget × scale beyond the DP axis limit.
    let m = write_case(
        dir.path(),
        &["a;g;75;1;x"],
        json!({ "baseline_life": 70, "budget": 1e9, "scale": 1000, "top_n": 1 }),
    );
    assert!(matches!(run_from_manifest_path(&m), Err(PipelineError::Domain(_))));
}

#[test]
fn validate_only_reports_without_running() {
    let dir = tempfile::tempdir().unwrap();
    let m = write_case(dir.path(), &["p1;g1;x;10;a"], params(70.0, 5.0, 1));
    let ctx = ctx_from_manifest_path(&m).unwrap();
    let report = validate_only(&ctx);
    assert!(report.pass);
    let codes: Vec<&str> = report.issues.iter().map(|i| i.code).collect();
    assert_eq!(codes, vec!["Row.ValueCoerced", "Budget.Infeasible", "Candidate.OverBudget"]);
}
