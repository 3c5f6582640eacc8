// End-to-end tests driving the built `mischeck` binary.
//
// Sheets are written to a temp dir; settings are isolated by pointing
// XDG_CONFIG_HOME at an empty directory.
//
// Run with: cargo test -p mischeck-cli --test cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

struct Env {
    dir: tempfile::TempDir,
}

impl Env {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mischeck"))
            .args(args)
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env_remove("MISCHECK_RULES")
            .env_remove("MISCHECK_LOG")
            .output()
            .expect("run mischeck")
    }
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(stdout.trim()).unwrap_or_else(|e| {
        panic!(
            "stdout must be one JSON value: {e}\nstdout:\n{stdout}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stderr)
        )
    })
}

const TUCK_HEADER: &str = "\
Waters Tuck Shop MIS
Date,Month,Wallet,Total Sale AI,PG Charges on MRP,PG+GST,Direct Payment from Employee,Buying Amt AI,GST,Selling Amount,Quantity
";

const TUCK_CLEAN_ROW: &str = "01-Mar-24,Mar-24,100,100,2,2.36,0,97.64,1.18,84.74576271186442,10\n";

// pg charges reported as 1.5 instead of 1.0
const TUCK_BAD_ROW: &str = "02-Mar-24,Mar-24,50,50,1.5,1.18,0,48.82,1.18,42.37288135593221,5\n";

// ===========================================================================
// mischeck check
// ===========================================================================

#[test]
fn clean_sheet_exits_zero() {
    let env = Env::new();
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--json"]);
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let val = json(&output);
    assert_eq!(val["status"], "checked");
    assert_eq!(val["period"], "Mar-24");
    assert_eq!(val["meta"]["ruleset"], "waters-tuck-shop");
    assert_eq!(val["meta"]["sheet"], "Waters Tuck Shop");
    assert_eq!(val["summary"]["rows"], 1);
    assert_eq!(val["summary"]["mismatches"], 0);
    assert!(val["mismatches"].as_array().unwrap().is_empty());

    let aggregates = val["aggregates"].as_array().unwrap();
    assert_eq!(aggregates[0]["label"], "Number of Days");
    assert_eq!(aggregates[0]["value"], 1);
}

#[test]
fn mismatches_exit_one_with_row_numbers() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}{TUCK_BAD_ROW}"),
    );

    let output = env.run(&["check", path_str(&sheet), "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let val = json(&output);
    let mismatches = val["mismatches"].as_array().unwrap();
    assert_eq!(mismatches.len(), 2);
    assert_eq!(mismatches[0]["row_number"], 4);
    assert_eq!(mismatches[0]["date"], "02-Mar-24");
    assert_eq!(mismatches[0]["column"], "pg charges on mrp");
    assert_eq!(mismatches[0]["expected"], 1.0);
    assert_eq!(mismatches[0]["actual"], 1.5);
    assert_eq!(mismatches[1]["column"], "pg+gst");
    assert_eq!(val["summary"]["mismatched_rows"], 1);
}

#[test]
fn empty_line_does_not_shift_row_numbers() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}\n{TUCK_CLEAN_ROW}{TUCK_BAD_ROW}"),
    );

    let output = env.run(&["check", path_str(&sheet), "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let val = json(&output);
    assert_eq!(val["mismatches"][0]["row_number"], 5);
    assert_eq!(val["mismatches"][0]["date"], "02-Mar-24");
}

#[test]
fn sheet_is_dispatched_once() {
    let env = Env::new();
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "-vv"]);
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("dispatched to ruleset").count(), 1, "stderr:\n{stderr}");
}

#[test]
fn human_output_lists_mismatch_table() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}{TUCK_BAD_ROW}"),
    );

    let output = env.run(&["check", path_str(&sheet)]);
    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mismatches"), "stdout:\n{stdout}");
    assert!(stdout.contains("pg charges on mrp"));
    assert!(stdout.contains("Number of Days"));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: 2 mismatches found"), "stderr:\n{stderr}");
}

#[test]
fn output_file_written() {
    let env = Env::new();
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));
    let report = env.dir.path().join("report.json");

    let output = env.run(&["check", path_str(&sheet), "--output", path_str(&report)]);
    assert_eq!(output.status.code(), Some(0));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(written["status"], "checked");
}

#[test]
fn unsupported_sheet_is_not_an_error() {
    let env = Env::new();
    let sheet = env.write("Waters Event.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let val = json(&output);
    assert_eq!(val["status"], "unsupported");
    assert_eq!(val["sheet"], "Waters Event");
}

#[test]
fn sheet_flag_overrides_file_name() {
    let env = Env::new();
    let sheet = env.write("export.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--sheet", "Waters Tuck Shop", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json(&output)["meta"]["ruleset"], "waters-tuck-shop");
}

#[test]
fn header_row_flag() {
    let env = Env::new();
    let body = TUCK_HEADER.lines().nth(1).unwrap();
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{body}\n{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--header-row", "0", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(json(&output)["summary"]["rows"], 1);
}

// ===========================================================================
// Period selection
// ===========================================================================

const APRIL_ROW: &str = "01-Apr-24,Apr-24,100,100,2,2.36,0,97.64,1.18,84.74576271186442,10\n";

#[test]
fn several_periods_require_choice() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}{APRIL_ROW}"),
    );

    let output = env.run(&["check", path_str(&sheet)]);
    assert_eq!(output.status.code(), Some(6));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Mar-24, Apr-24"), "stderr:\n{stderr}");
}

#[test]
fn period_flag_filters_rows() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}{TUCK_BAD_ROW}{APRIL_ROW}"),
    );

    let output = env.run(&["check", path_str(&sheet), "--period", "Apr-24", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let val = json(&output);
    assert_eq!(val["period"], "Apr-24");
    assert_eq!(val["summary"]["rows"], 1);

    let output = env.run(&["check", path_str(&sheet), "--period", "May-24"]);
    assert_eq!(output.status.code(), Some(6));
}

#[test]
fn periods_command_lists_in_order() {
    let env = Env::new();
    let sheet = env.write(
        "Waters Tuck Shop.csv",
        &format!("{TUCK_HEADER}{APRIL_ROW}{TUCK_CLEAN_ROW}{APRIL_ROW}"),
    );

    let output = env.run(&["periods", path_str(&sheet)]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let periods: Vec<&str> = stdout.lines().collect();
    assert_eq!(periods, vec!["Apr-24", "Mar-24"]);
}

#[test]
fn no_period_column_is_a_notice() {
    let env = Env::new();
    let sheet = env.write("Waters Tuck Shop.csv", "title\ndate,wallet\n01-Mar-24,5\n");

    let output = env.run(&["check", path_str(&sheet)]);
    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no 'month' column"), "stderr:\n{stderr}");
}

// ===========================================================================
// Errors
// ===========================================================================

#[test]
fn missing_sheet_is_io_error() {
    let env = Env::new();
    let missing = env.dir.path().join("nope.csv");
    let output = env.run(&["check", path_str(&missing)]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn empty_sheet_is_parse_error() {
    let env = Env::new();
    let sheet = env.write("Waters Tuck Shop.csv", "just a title\n");
    let output = env.run(&["check", path_str(&sheet)]);
    assert_eq!(output.status.code(), Some(4));
}

#[test]
fn bad_arguments_are_usage_error() {
    let env = Env::new();
    let output = env.run(&["check"]);
    assert_eq!(output.status.code(), Some(2));
}

// ===========================================================================
// Rulesets
// ===========================================================================

const CANTEEN_RULESET: &str = r#"
name = "test-canteen"
sheets = ["Test Canteen"]

[[rules]]
target = "amount"
expr = "[pax] * [price]"
"#;

#[test]
fn rules_dir_adds_rulesets() {
    let env = Env::new();
    let rules = env.dir.path().join("rules");
    env.write("rules/canteen.toml", CANTEEN_RULESET);
    let sheet = env.write(
        "Test Canteen.csv",
        "Canteen\ndate,month,pax,price,amount\n01-Mar-24,Mar-24,10,5,50\n02-Mar-24,Mar-24,10,5,55\n",
    );

    let output = env.run(&["check", path_str(&sheet), "--rules", path_str(&rules), "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let val = json(&output);
    assert_eq!(val["meta"]["ruleset"], "test-canteen");
    assert_eq!(val["mismatches"][0]["row_number"], 4);
    assert_eq!(val["mismatches"][0]["expected"], 50.0);
}

#[test]
fn rules_dir_from_environment() {
    let env = Env::new();
    let rules = env.dir.path().join("rules");
    env.write("rules/canteen.toml", CANTEEN_RULESET);
    let sheet = env.write(
        "Test Canteen.csv",
        "Canteen\ndate,month,pax,price,amount\n01-Mar-24,Mar-24,10,5,50\n",
    );

    let output = Command::new(env!("CARGO_BIN_EXE_mischeck"))
        .args(["check", path_str(&sheet)])
        .env("XDG_CONFIG_HOME", env.dir.path().join("config"))
        .env("MISCHECK_RULES", &rules)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}

#[test]
fn invalid_rules_dir_ruleset_exits_five() {
    let env = Env::new();
    let rules = env.dir.path().join("rules");
    env.write("rules/broken.toml", "name = \"broken\"\nsheets = []\n");
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--rules", path_str(&rules)]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn conflicting_sheet_claim_exits_five() {
    let env = Env::new();
    let rules = env.dir.path().join("rules");
    env.write(
        "rules/clash.toml",
        "name = \"clash\"\nsheets = [\"Waters Tuck Shop\"]\n",
    );
    let sheet = env.write("Waters Tuck Shop.csv", &format!("{TUCK_HEADER}{TUCK_CLEAN_ROW}"));

    let output = env.run(&["check", path_str(&sheet), "--rules", path_str(&rules)]);
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Waters Tuck Shop"), "stderr:\n{stderr}");
}

#[test]
fn rulesets_list_json() {
    let env = Env::new();
    let output = env.run(&["rulesets", "list", "--json"]);
    assert_eq!(output.status.code(), Some(0));
    let val = json(&output);
    let list = val.as_array().unwrap();
    assert_eq!(list.len(), 8);
    assert!(list.iter().any(|r| r["name"] == "airtel-noida"));
}

#[test]
fn rulesets_validate() {
    let env = Env::new();
    let good = env.write("good.toml", CANTEEN_RULESET);
    let output = env.run(&["rulesets", "validate", path_str(&good)]);
    assert_eq!(output.status.code(), Some(0));

    let bad = env.write("bad.toml", "name = \"bad\"\nsheets = [\"X\"]\n[[rules]]\ntarget = \"a\"\nexpr = \"[b] +\"\n");
    let output = env.run(&["rulesets", "validate", path_str(&bad)]);
    assert_eq!(output.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot parse formula"), "stderr:\n{stderr}");
}
