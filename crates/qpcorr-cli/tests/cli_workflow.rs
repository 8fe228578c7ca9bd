use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const QUADS_PER_ARC: usize = 10;

fn twiss_source() -> String {
    let mut lines = vec![
        "@ NAME             %05s \"TWISS\"".to_string(),
        "* NAME KEYWORD S MUX MUY BETX BETY".to_string(),
        "$ %s %s %le %le %le %le %le".to_string(),
    ];
    let mut row = 0;
    let mut push = |lines: &mut Vec<String>, name: String, keyword: &str| {
        lines.push(format!(
            "\"{name}\" {keyword} {:.3} {:.6} {:.6} {:.4} {:.4}",
            row as f64 * 10.0,
            0.06 + 0.05 * row as f64,
            0.09 + 0.045 * row as f64,
            25.0 + ((row * 31) % 41) as f64 * 4.2,
            18.0 + ((row * 23) % 37) as f64 * 3.9,
        ));
        row += 1;
    };
    for ip in 1..=2 {
        push(&mut lines, format!("IP.{ip}"), "MARKER");
        for index in 0..QUADS_PER_ARC {
            push(&mut lines, format!("QD{ip}{index:02}.1"), "QUADRUPOLE");
        }
        push(&mut lines, format!("DRIFT_{ip}"), "DRIFT");
    }
    lines.join("\n") + "\n"
}

fn sequence_source() -> String {
    let mut lines = Vec::new();
    for ip in 1..=2 {
        for index in 0..QUADS_PER_ARC {
            lines.push(format!("K1QD{ip}{index:02} = 0.0{};", index + 1));
            lines.push(format!("LQD{ip}{index:02} = 1.5;"));
        }
    }
    lines.join("\n") + "\n"
}

fn write_file(path: &Path, content: &str) -> PathBuf {
    fs::write(path, content).expect("fixture should be written");
    path.to_path_buf()
}

fn run_qpcorr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_qpcorr"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("qpcorr should run")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp path should be UTF-8")
}

#[test]
fn select_prints_a_summary_for_every_ip() {
    let temp = TempDir::new().expect("tempdir should be created");
    let twiss = write_file(&temp.path().join("twiss.tfs"), &twiss_source());
    let sequence = write_file(&temp.path().join("ring.seq"), &sequence_source());

    let output = run_qpcorr(&[
        "select",
        "--twiss",
        path_arg(&twiss),
        "--sequence",
        path_arg(&sequence),
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("IP.1 (row 0"));
    assert!(stdout.contains("IP.2 (row 12"));
    assert!(stdout.contains("Strengths:"));
}

#[test]
fn solve_emits_json_report_with_converged_solutions() {
    let temp = TempDir::new().expect("tempdir should be created");
    let twiss = write_file(&temp.path().join("twiss.tfs"), &twiss_source());

    let output = run_qpcorr(&["solve", "--twiss", path_arg(&twiss), "--ip", "1", "--json"]);

    assert_eq!(output.status.code(), Some(0));
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let ips = report["interaction_points"].as_array().expect("ips array");
    assert_eq!(ips.len(), 1);

    let solutions = ips[0]["solutions"].as_array().expect("solutions array");
    assert_eq!(solutions.len(), 2);
    for solution in solutions {
        assert_eq!(solution["outcome"]["converged"], true);
        assert_eq!(solution["magnets"].as_array().map(Vec::len), Some(8));
    }
}

#[test]
fn solve_exits_one_when_iteration_cap_is_hit() {
    let temp = TempDir::new().expect("tempdir should be created");
    let twiss = write_file(&temp.path().join("twiss.tfs"), &twiss_source());

    let output = run_qpcorr(&[
        "solve",
        "--twiss",
        path_arg(&twiss),
        "--ip",
        "2",
        "--threshold",
        "1e-30",
        "--max-iterations",
        "1",
    ]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("NOT CONVERGED"));
}

#[test]
fn config_file_and_data_dir_drive_selection() {
    let temp = TempDir::new().expect("tempdir should be created");
    let data_dir = temp.path().join("data");
    fs::create_dir(&data_dir).expect("data dir should be created");
    write_file(&data_dir.join("a_twiss.tfs"), &twiss_source());
    write_file(&data_dir.join("b_twiss.tfs"), &twiss_source());
    let config = write_file(
        &temp.path().join("config.json"),
        r#"{ "window": 6, "selected": 4 }"#,
    );

    let output = run_qpcorr(&[
        "select",
        "--config",
        path_arg(&config),
        "--data-dir",
        path_arg(&data_dir),
        "--file-index",
        "2",
        "--ip",
        "2",
        "--json",
    ]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert!(report["optics_path"].as_str().unwrap().ends_with("b_twiss.tfs"));
    assert_eq!(report["window"], 6);
    let selection = &report["interaction_points"][0]["selection"];
    for subset in ["left_x", "left_y", "right_x", "right_y"] {
        assert_eq!(selection[subset].as_array().map(Vec::len), Some(2));
    }
}

#[test]
fn strengths_lists_sequence_records() {
    let temp = TempDir::new().expect("tempdir should be created");
    let sequence = write_file(&temp.path().join("ring.seq"), &sequence_source());

    let output = run_qpcorr(&["strengths", "--sequence", path_arg(&sequence), "--json"]);

    assert!(output.status.success());
    let records: Value = serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    let records = records.as_array().expect("records array");
    assert_eq!(records.len(), 2 * QUADS_PER_ARC);
    assert_eq!(records[0]["name"], "QD100");
    assert_eq!(records[0]["length"], 1.5);
}

#[test]
fn malformed_optics_table_exits_with_input_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let twiss = write_file(
        &temp.path().join("twiss.tfs"),
        "* NAME KEYWORD S MUX MUY BETX BETY\n\"IP.1\" MARKER 0.0 0.0\n",
    );

    let output = run_qpcorr(&["select", "--twiss", path_arg(&twiss)]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [INPUT.TFS_ROW]"), "stderr: {stderr}");
}

#[test]
fn missing_optics_file_exits_with_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("missing.tfs");

    let output = run_qpcorr(&["select", "--twiss", path_arg(&missing)]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("IO.INPUT_READ"));
}

#[test]
fn odd_selection_count_is_rejected() {
    let temp = TempDir::new().expect("tempdir should be created");
    let twiss = write_file(&temp.path().join("twiss.tfs"), &twiss_source());

    let output = run_qpcorr(&["select", "--twiss", path_arg(&twiss), "--selected", "5"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.CONFIG_INVALID"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let output = run_qpcorr(&["select", "--no-such-flag"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.CLI_USAGE"));
}
