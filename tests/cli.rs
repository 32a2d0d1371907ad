//! E2E tests driving the binary through `cargo run`

use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::str::FromStr;

fn run(args: &[&str]) -> Output {
    Command::new("cargo")
        .arg("run")
        .arg("--quiet")
        .arg("--")
        .args(args)
        .env_remove("INPUT_FILE")
        .env_remove("OUTPUT_FILE")
        .output()
        .expect("Failed to execute command")
}

fn decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

/// Report writes the four CSV tables and prints the summary
#[test]
fn report_writes_csv_tables() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report");
    let output = run(&[
        "report",
        "-i",
        "tests/data/hifo_basic.csv",
        "-o",
        out.to_str().unwrap(),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(stdout.contains("REALIZED GAINS (HIFO)"));
    assert!(stdout.contains("TOTAL"));
    assert!(stdout.contains("57000.00"));
    assert!(stdout.contains("48000.00"));
    assert!(stdout.contains("+9000.00"));

    for name in [
        "inputs.csv",
        "sell_txns.csv",
        "buy_txns.csv",
        "sell_fragments.csv",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    let fragments = fs::read_to_string(out.join("sell_fragments.csv")).unwrap();
    let lines: Vec<&str> = fragments.lines().collect();
    assert_eq!(lines.len(), 4, "header plus three fragments: {}", fragments);
    // highest cost lot first, then the next one down
    assert!(lines[1].starts_with("s1-1,BTC,s1,b2,"));
    assert!(lines[2].starts_with("s1-2,BTC,s1,b3,"));
    assert!(lines[3].starts_with("s2-1,ETH,s2,b4,"));
}

/// JSON format holds every table plus the summary in one document
#[test]
fn report_writes_json_document() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("gains.json");
    let output = run(&[
        "report",
        "-i",
        "tests/data/hifo_basic.csv",
        "-o",
        out.to_str().unwrap(),
        "--format",
        "json",
    ]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();

    assert_eq!(doc["inputs"].as_array().unwrap().len(), 6);
    assert_eq!(doc["sell_txns"].as_array().unwrap().len(), 2);
    assert_eq!(doc["buy_txns"].as_array().unwrap().len(), 4);
    assert_eq!(doc["buy_txns"][0]["id"], "b2");

    let fragments = doc["sell_fragments"].as_array().unwrap();
    assert_eq!(fragments.len(), 3);
    assert_eq!(fragments[1]["buy_txn_id"], "b3");
    assert_eq!(decimal(&fragments[1]["fragment_sell_qty"]), Decimal::from_str("0.5").unwrap());
    assert_eq!(decimal(&fragments[1]["gain_loss"]), Decimal::from(5000));

    let summary = &doc["summary"];
    assert_eq!(summary["fragment_count"], 3);
    assert_eq!(decimal(&summary["proceeds"]), Decimal::from(57000));
    assert_eq!(decimal(&summary["cost_basis"]), Decimal::from(48000));
    assert_eq!(decimal(&summary["gain_loss"]), Decimal::from(9000));
    assert_eq!(summary["assets"][0]["asset"], "BTC");
    assert_eq!(summary["assets"][1]["asset"], "ETH");
}

/// Input and output can come from the environment
#[test]
fn report_reads_locations_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("env-report");
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--", "report"])
        .env("INPUT_FILE", "tests/data/hifo_basic.csv")
        .env("OUTPUT_FILE", &out)
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(out.join("sell_fragments.csv").exists());
}

/// Missing output location is a configuration error
#[test]
fn report_requires_output() {
    let output = run(&["report", "-i", "tests/data/hifo_basic.csv"]);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("OUTPUT_FILE"), "stderr: {}", stderr);
}

/// Lots bought after the sell are not used, the shortfall is reported
#[test]
fn report_warns_on_unmatched_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report");
    let output = run(&[
        "report",
        "-i",
        "tests/data/future_lots.csv",
        "-o",
        out.to_str().unwrap(),
    ]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("InsufficientLots"));
    assert!(stdout.contains("+15000.00"));

    let fragments = fs::read_to_string(out.join("sell_fragments.csv")).unwrap();
    assert_eq!(fragments.lines().count(), 2);
    assert!(!fragments.contains(",b2,"));
}

/// Bad rows stop the run unless --skip-invalid is given
#[test]
fn report_rejects_bad_rows() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("report");
    let out = out.to_str().unwrap();

    let output = run(&["report", "-i", "tests/data/bad_rows.csv", "-o", out]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("2 input row(s) could not be parsed"), "stderr: {}", stderr);
    assert!(!Path::new(out).exists());

    let output = run(&[
        "report",
        "-i",
        "tests/data/bad_rows.csv",
        "-o",
        out,
        "--skip-invalid",
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("SkippedRow"));
    assert!(stdout.contains("+5000.00"));
}

/// Validate exits non-zero when there are issues
#[test]
fn validate_reports_issues() {
    let output = run(&["validate", "-i", "tests/data/hifo_basic.csv"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert!(stdout.contains("No issues found"));

    let output = run(&["validate", "-i", "tests/data/bad_rows.csv", "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["rows"], 4);
    assert_eq!(doc["issue_count"], 2);
    assert_eq!(doc["issues"][0]["type"], "SkippedRow");
    assert_eq!(doc["issues"][0]["id"], "b2");
}

/// Lots lists what is left of each purchase, highest unit cost first
#[test]
fn lots_json() {
    let output = run(&["lots", "-i", "tests/data/hifo_basic.csv", "--json"]);
    assert!(output.status.success(), "Command failed: {:?}", output);

    let lots: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = lots
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b3", "b1", "b4"]);
    assert_eq!(decimal(&lots[0]["qty_left"]), Decimal::from_str("0.5").unwrap());
    assert_eq!(decimal(&lots[2]["qty_sold"]), Decimal::from(4));
}

/// Schema prints the CSV header and the JSON report schema
#[test]
fn schema_outputs() {
    let output = run(&["schema", "csv-header"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        "id,exchange,action,date,asset,quantity,amount"
    );

    let output = run(&["schema", "json-schema"]);
    assert!(output.status.success(), "Command failed: {:?}", output);
    let schema: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(schema["title"], "JsonReport");
    assert!(schema["properties"]["sell_fragments"].is_object());
}
