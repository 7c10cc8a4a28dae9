use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn json_output(args: &[&str]) -> Value {
    let output = Command::cargo_bin("pv")
        .unwrap()
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn string_size_reports_bounds() {
    let value = json_output(&["string", "size", "--coeff-voc", "-0.28", "--t-max", "45"]);
    assert_eq!(value["max_by_voc"], 19);
    assert_eq!(value["max_by_mppt"], 17);
    assert_eq!(value["max_modules"], 17);
    let recommended = value["recommended"].as_u64().unwrap();
    let min = value["min_modules"].as_u64().unwrap();
    assert!(recommended >= min && recommended <= 17);
}

#[test]
fn string_size_table_output() {
    Command::cargo_bin("pv")
        .unwrap()
        .args(["string", "size", "--coeff-voc", "-0.28", "--t-max", "45"])
        .assert()
        .success()
        .stdout(predicate::str::contains("max by MPPT"))
        .stdout(predicate::str::contains("DIAGNOSTICS"));
}

#[test]
fn string_check_flags_out_of_range() {
    let value = json_output(&["string", "check", "--modules", "25", "--coeff-voc", "-0.28"]);
    assert_eq!(value["within_range"], false);
    let issues = value["diagnostics"]["issues"].as_array().unwrap();
    assert!(issues
        .iter()
        .any(|i| i["message"].as_str().unwrap().contains("outside the allowed range")));
}

#[test]
fn invalid_inverter_window_fails() {
    Command::cargo_bin("pv")
        .unwrap()
        .args(["string", "size", "--mppt-min", "900", "--mppt-max", "800"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mppt_voltage_min"));
}

#[test]
fn string_size_crossed_bounds_are_adjusted() {
    let args = [
        "string",
        "size",
        "--coeff-voc",
        "-0.28",
        "--mppt-min",
        "700",
        "--mppt-max",
        "750",
        "--max-dc-voltage",
        "800",
        "--t-max",
        "80",
    ];
    let value = json_output(&args);
    assert_eq!(value["adjusted"], true);
    assert!(value["min_modules"].as_u64().unwrap() <= value["max_modules"].as_u64().unwrap());

    Command::cargo_bin("pv")
        .unwrap()
        .args(args)
        .assert()
        .success()
        .stdout(predicate::str::contains("constraints automatically adjusted"))
        .stdout(predicate::str::contains("Adjusted to:"));
}

#[test]
fn string_params_counts_strings() {
    let value = json_output(&["string", "params", "--capacity-kw", "50", "--modules", "17"]);
    assert_eq!(value["total_modules"], 125);
    assert_eq!(value["total_strings"], 8);
}

#[test]
fn cable_string_skips_undersized_sizes() {
    let value = json_output(&["cable", "string", "--imp", "40", "--ambient", "50"]);
    assert_eq!(value["selection"]["design_current"], 50.0);
    let six = value["selection"]["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["cable"]["cross_section"] == 6.0)
        .unwrap()
        .clone();
    assert_eq!(six["suitable"], false);
    assert!((six["derated_ampacity"].as_f64().unwrap() - 41.82).abs() < 1e-9);
    assert_eq!(value["chosen"]["cross_section"], 10.0);
}

#[test]
fn cable_string_checks_requested_size() {
    let value = json_output(&[
        "cable",
        "string",
        "--imp",
        "40",
        "--cross-section",
        "6",
        "--modules",
        "17",
        "--length",
        "30",
    ]);
    assert_eq!(value["chosen"]["cross_section"], 6.0);
    assert_eq!(value["chosen_suitable"], false);
    assert_eq!(value["selection"]["recommended"]["cross_section"], 10.0);
    assert!(value["voltage_drop"]["volts"].as_f64().unwrap() > 0.0);

    Command::cargo_bin("pv")
        .unwrap()
        .args(["cable", "string", "--imp", "40", "--cross-section", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6 mm² Cu (undersized)"))
        .stdout(predicate::str::contains("is undersized"));
}

#[test]
fn cable_string_unknown_size_is_reported() {
    Command::cargo_bin("pv")
        .unwrap()
        .args(["cable", "string", "--cross-section", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not in catalog"));
}

#[test]
fn cable_ht_sizes_buried_run() {
    let value = json_output(&["cable", "ht", "--current", "150", "--length", "2000"]);
    // 187.5 A design; 120 mm² carries 265 × 0.718 = 190.4 A
    assert_eq!(value["design_current"], 187.5);
    assert_eq!(value["chosen"]["cross_section"], 120.0);
    assert_eq!(value["voltage_drop"]["limit_percent"], 2.0);
    assert_eq!(value["voltage_drop"]["acceptable"], true);

    let wet = json_output(&[
        "cable",
        "ht",
        "--current",
        "150",
        "--length",
        "2000",
        "--soil-resistivity",
        "1.0",
    ]);
    // K3 = √1.5 lifts 95 mm² to 206.7 A
    assert_eq!(wet["chosen"]["cross_section"], 95.0);
}

#[test]
fn cable_dcdb_with_custom_catalog() {
    let catalog = repo_path("test_data/cables_al.json");
    let value = json_output(&[
        "cable",
        "dcdb",
        "--imp",
        "10.8",
        "--strings",
        "8",
        "--modules",
        "20",
        "--length",
        "100",
        "--material",
        "al",
        "--catalog",
        catalog.to_str().unwrap(),
    ]);
    // 86.4 A × 1.25 = 108 A; 25 mm² carries 97 × 0.82 = 79.5 A, 35 mm² 97.6 A
    assert_eq!(value["chosen"], Value::Null);
    assert_eq!(value["selection"]["recommended"], Value::Null);
}

#[test]
fn drop_dc_reference_case() {
    let value = json_output(&[
        "drop",
        "dc",
        "--current",
        "10",
        "--resistance",
        "1.84",
        "--length",
        "50",
        "--voltage",
        "400",
    ]);
    assert!((value["volts"].as_f64().unwrap() - 1.84).abs() < 1e-9);
    assert!((value["percent"].as_f64().unwrap() - 0.46).abs() < 1e-9);
    assert_eq!(value["acceptable"], true);
}

#[test]
fn config_policy_tightens_drop_limit() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[policy]\nstring_drop_limit_percent = 2.0\n").unwrap();
    let value = json_output(&[
        "--config",
        config.to_str().unwrap(),
        "drop",
        "dc",
        "--current",
        "10",
        "--resistance",
        "1.84",
        "--length",
        "250",
        "--voltage",
        "400",
    ]);
    assert!((value["percent"].as_f64().unwrap() - 2.3).abs() < 1e-9);
    assert_eq!(value["limit_percent"], 2.0);
    assert_eq!(value["acceptable"], false);
}

#[test]
fn drop_ac_reports_loss() {
    let value = json_output(&[
        "drop",
        "ac",
        "--current",
        "100",
        "--length",
        "100",
        "--cross-section",
        "50",
        "--material",
        "copper",
    ]);
    // R = 0.0175 × 100 / 50 = 0.035 Ω; Vd = √3 × 100 × 0.035
    assert!((value["resistance"].as_f64().unwrap() - 0.035).abs() < 1e-12);
    assert!((value["volts"].as_f64().unwrap() - 6.0622).abs() < 1e-3);
    assert!((value["power_loss"].as_f64().unwrap() - 1050.0).abs() < 1e-6);
}

#[test]
fn drop_ac_parallel_runs_halve_resistance() {
    let value = json_output(&[
        "drop",
        "ac",
        "--current",
        "100",
        "--length",
        "100",
        "--cross-section",
        "50",
        "--runs",
        "2",
    ]);
    assert!((value["resistance"].as_f64().unwrap() - 0.0175).abs() < 1e-12);
    assert!((value["power_loss"].as_f64().unwrap() - 525.0).abs() < 1e-6);
    assert_eq!(value["runs"], 2);
}

#[test]
fn invalid_config_log_level_exits_with_config_error() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[logging]\nlevel = \"verbose\"\n").unwrap();
    Command::cargo_bin("pv")
        .unwrap()
        .args(["--config", config.to_str().unwrap(), "breaker", "--current", "10"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid log level 'verbose'"));
}

#[test]
fn breaker_picks_next_rating() {
    let value = json_output(&["breaker", "--current", "80", "--kind", "mccb"]);
    assert_eq!(value["required_rating"], 100.0);
    assert_eq!(value["rating"], 100.0);
    assert_eq!(value["kind"], "MCCB");
}

#[test]
fn breaker_beyond_largest_frame() {
    let value = json_output(&["breaker", "--current", "60", "--kind", "mcb"]);
    assert_eq!(value["rating"], Value::Null);
}

#[test]
fn ac_current_three_phase() {
    let value = json_output(&["ac-current", "--power-kw", "50", "--voltage", "415"]);
    assert!((value.as_f64().unwrap() - 73.22).abs() < 0.01);
}

#[test]
fn dcdb_defaults_to_inverter_inputs() {
    let value = json_output(&["dcdb", "--total-strings", "300", "--inverters", "1"]);
    assert_eq!(value["dcdb_per_inverter"], 20);
    assert_eq!(value["strings_per_dcdb"], 15);
}

#[test]
fn mppt_assign_from_group_file() {
    let dir = tempdir().unwrap();
    let groups = dir.path().join("groups.yaml");
    fs::write(
        &groups,
        "- name: south\n  strings: 4\n  modules_per_string: 16\n  orientation: { tilt: 15, azimuth: 180 }\n",
    )
    .unwrap();
    let value = json_output(&[
        "mppt",
        "assign",
        "--groups",
        groups.to_str().unwrap(),
        "--max-dc-current",
        "60",
    ]);
    assert_eq!(value["unassigned_strings"], 0);
    assert_eq!(value["report"]["utilized_mppts"], 2);
    assert_eq!(value["report"]["mppts"][0]["strings"], 2);
    assert_eq!(value["report"]["mppts"][1]["strings"], 2);
}

#[test]
fn mppt_check_flags_mixed_orientation() {
    let assignments = repo_path("test_data/mppt_assignments.yaml");
    let value = json_output(&[
        "mppt",
        "check",
        "--assignments",
        assignments.to_str().unwrap(),
        "--max-dc-current",
        "60",
    ]);
    assert_eq!(value["utilized_mppts"], 2);
    assert_eq!(value["mppts"][1]["strings"], 2);
    let messages: Vec<&str> = value["diagnostics"]["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["message"].as_str().unwrap())
        .collect();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Orientation mismatch"));

    Command::cargo_bin("pv")
        .unwrap()
        .args([
            "mppt",
            "check",
            "--assignments",
            assignments.to_str().unwrap(),
            "--max-dc-current",
            "60",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inverter 1 MPPT 2"))
        .stdout(predicate::str::contains("east×1, west×1"));
}

#[test]
fn project_evaluate_table() {
    let project = repo_path("test_data/projects/rooftop.yaml");
    Command::cargo_bin("pv")
        .unwrap()
        .args(["project", "evaluate", project.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("rooftop-50kw"))
        .stdout(predicate::str::contains("STRING CABLE"))
        .stdout(predicate::str::contains("AC CABLE"));
}

#[test]
fn project_evaluate_writes_report_and_manifest() {
    let project = repo_path("test_data/projects/rooftop.yaml");
    let dir = tempdir().unwrap();
    let out = dir.path().join("reports").join("rooftop.json");
    Command::cargo_bin("pv")
        .unwrap()
        .args([
            "project",
            "evaluate",
            project.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded run manifest"));

    let report: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(report["modules_per_string"], 17);
    assert_eq!(report["plant"]["total_strings"], 8);

    let manifests: Vec<_> = fs::read_dir(out.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("run-"))
        .collect();
    assert_eq!(manifests.len(), 1);
    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(manifests[0].path()).unwrap()).unwrap();
    assert_eq!(manifest["command"], "project evaluate");
    assert_eq!(manifest["inputs"][0]["sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn project_with_ht_export_run() {
    let dir = tempdir().unwrap();
    let project = dir.path().join("farm.yaml");
    fs::write(
        &project,
        r#"
name: farm
inverter:
  maximum_ac_power_kw: 250
inverter_count: 8
ht_cable:
  length: 3000
  line_voltage: 33000
  burial:
    depth: 1.0
"#,
    )
    .unwrap();
    Command::cargo_bin("pv")
        .unwrap()
        .args(["project", "evaluate", project.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("HT CABLE"))
        .stdout(predicate::str::contains("K factors"));
}

#[test]
fn project_without_ac_rating_skips_ac_cable() {
    let dir = tempdir().unwrap();
    let project = dir.path().join("dc-only.yaml");
    fs::write(
        &project,
        "name: dc-only\nac_cable:\n  length: 60\n  line_voltage: 415\n",
    )
    .unwrap();
    Command::cargo_bin("pv")
        .unwrap()
        .args(["project", "evaluate", project.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("AC CABLE").not())
        .stdout(predicate::str::contains("needs the inverter's nominal AC power"));
}

#[test]
fn completions_for_bash() {
    Command::cargo_bin("pv")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pv"));
}
