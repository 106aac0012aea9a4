use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

const INSTRUMENTS: &str = r#"
instruments:
  - id: gold
    name: Gold
    ticker: GC=F
    module: commodities
    unit_label: USD/oz
    sort_order: 1
  - id: brent
    name: Brent
    ticker: BZ=F
    module: commodities
    sort_order: 0
  - id: aapl
    name: Apple
    ticker: AAPL
    module: mag7
  - id: inflation_us
    name: US CPI
    ticker: CPIAUCSL
    module: inflation
"#;

fn write_instruments(dir: &Path) -> PathBuf {
    let path = dir.join("instruments.yaml");
    fs::write(&path, INSTRUMENTS).expect("failed to write instruments");
    path
}

fn ekodash() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ekodash"));
    for var in [
        "EKODASH_FORMAT",
        "EKODASH_INSTRUMENTS",
        "EKODASH_DATABASE",
        "EKODASH_DISABLE_SCHEDULER",
        "EKODASH_YAHOO_BASE_URL",
        "EKODASH_FRED_BASE_URL",
        "EKODASH_RETRY_ATTEMPTS",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn version_prints_package_version() {
    ekodash()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "ekodash version {}",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn help_lists_commands() {
    ekodash()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refresh"))
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("jobs"));
}

#[test]
fn instruments_json_lists_configured_items() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let path = write_instruments(temp.path());

    let assert = ekodash()
        .args(["--format", "json", "instruments", "--module", "commodities", "--instruments"])
        .arg(&path)
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    let value: serde_json::Value = serde_json::from_str(&stdout)?;
    let ids: Vec<&str> = value["data"]
        .as_array()
        .expect("data array")
        .iter()
        .filter_map(|item| item["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["brent", "gold"]);
    assert_eq!(value["meta"]["version"], env!("CARGO_PKG_VERSION"));

    Ok(())
}

#[test]
fn instruments_table_uses_env_path() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let path = write_instruments(temp.path());

    ekodash()
        .args(["--format", "table", "instruments"])
        .env("EKODASH_INSTRUMENTS", &path)
        .assert()
        .success()
        .stdout(predicate::str::contains("TICKER"))
        .stdout(predicate::str::contains("CPIAUCSL"));

    Ok(())
}

#[test]
fn missing_instruments_file_fails() {
    ekodash()
        .args(["instruments", "--instruments", "/definitely/not/here.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn status_without_database() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let database = temp.path().join("ekodash.db");

    ekodash()
        .arg("status")
        .arg("--database")
        .arg(&database)
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not created yet"))
        .stdout(predicate::str::contains(database.to_string_lossy().to_string()));

    assert!(!database.exists());
    Ok(())
}

#[test]
fn jobs_without_database_is_empty_json() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    let assert = ekodash()
        .args(["--format", "json", "jobs", "--database"])
        .arg(temp.path().join("missing.db"))
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(value["data"], serde_json::json!([]));
    Ok(())
}

#[test]
fn unknown_module_is_rejected() {
    ekodash()
        .args(["summary", "crypto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown module"));
}

#[test]
fn report_without_database_fails() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    ekodash()
        .args(["report", "--database"])
        .arg(temp.path().join("missing.db"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("run 'ekodash refresh' first"));

    Ok(())
}

/// Point both providers at a closed local port so every fetch fails fast.
fn unreachable_upstreams(cmd: &mut Command) -> &mut Command {
    cmd.env("EKODASH_YAHOO_BASE_URL", "http://127.0.0.1:9")
        .env("EKODASH_FRED_BASE_URL", "http://127.0.0.1:9")
        .env("EKODASH_RETRY_ATTEMPTS", "1")
}

#[test]
fn reads_after_failed_refresh_come_from_database() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let instruments = write_instruments(temp.path());
    let database = temp.path().join("ekodash.db");

    unreachable_upstreams(&mut ekodash())
        .args(["--format", "json", "refresh", "--instruments"])
        .arg(&instruments)
        .arg("--database")
        .arg(&database)
        .assert()
        .success();

    // Placeholder rows were persisted, so no upstream fetch happens
    let assert = unreachable_upstreams(&mut ekodash())
        .args(["--format", "json", "summary", "commodities", "--instruments"])
        .arg(&instruments)
        .arg("--database")
        .arg(&database)
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(value["data"]["meta"]["cached"], true);
    assert_eq!(value["data"]["meta"]["stale_reason"], "global_threshold");
    assert_eq!(value["data"]["items"][0]["id"], "brent");
    assert_eq!(value["data"]["items"][0]["is_stale"], true);

    let assert = ekodash()
        .args(["--format", "json", "report", "--database"])
        .arg(&database)
        .assert()
        .success();
    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let data = &value["data"];
    assert_eq!(data["level"], "mixed");
    assert_eq!(data["score"], -1);
    assert_eq!(data["data_points"]["stale_count"], 4);
    assert_eq!(data["data_points"]["mag7_breadth_positive_share"], 0.0);

    ekodash()
        .args(["report", "--markdown", "--database"])
        .arg(&database)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# US macro assessment"))
        .stdout(predicate::str::contains("US CPI missing"));

    Ok(())
}

#[test]
fn serve_with_scheduler_disabled_exits() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;

    ekodash()
        .arg("serve")
        .arg("--database")
        .arg(temp.path().join("ekodash.db"))
        .env("EKODASH_DISABLE_SCHEDULER", "true")
        .assert()
        .success()
        .stderr(predicate::str::contains("Scheduler disabled"));

    Ok(())
}

/// Chart payload with three daily closes, the middle one missing.
fn chart_body() -> String {
    r#"{
        "chart": {
            "result": [{
                "timestamp": [1767571200, 1767657600, 1767744000],
                "indicators": { "quote": [{ "close": [100.0, null, 101.5] }] }
            }],
            "error": null
        }
    }"#
    .to_string()
}

/// Two years of monthly index levels.
fn fred_body() -> String {
    let mut body = String::from("observation_date,CPIAUCSL\n");
    for i in 0..24 {
        let year = 2024 + i / 12;
        let month = i % 12 + 1;
        body.push_str(&format!("{}-{:02}-01,{:.2}\n", year, month, 300.0 + i as f64));
    }
    body
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn refresh_against_mocked_upstreams_records_job() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _chart = server
        .mock("GET", mockito::Matcher::Regex(r"^/v8/finance/chart/.+$".to_string()))
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(chart_body())
        .create();
    let _fred = server
        .mock("GET", "/graph/fredgraph.csv")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/csv")
        .with_body(fred_body())
        .create();

    let temp = tempdir()?;
    let instruments = write_instruments(temp.path());
    let database = temp.path().join("ekodash.db");

    let assert = ekodash()
        .args(["--format", "json", "refresh", "--instruments"])
        .arg(&instruments)
        .arg("--database")
        .arg(&database)
        .env("EKODASH_YAHOO_BASE_URL", server.url())
        .env("EKODASH_FRED_BASE_URL", server.url())
        .env("EKODASH_RETRY_ATTEMPTS", "1")
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(value["data"]["outcome"]["status"], "success");
    assert_eq!(value["data"]["outcome"]["ok_count"], 4);
    assert_eq!(value["data"]["health"]["is_stale"], false);
    assert_eq!(value["data"]["health"]["provider_stats"]["yahoo"]["fail"], 0);

    // A later process reads the stored snapshot instead of the dead upstream
    let assert = unreachable_upstreams(&mut ekodash())
        .args(["--format", "json", "summary", "commodities", "--instruments"])
        .arg(&instruments)
        .arg("--database")
        .arg(&database)
        .assert()
        .success();
    let summary: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(summary["data"]["meta"]["cached"], true);
    assert_eq!(summary["data"]["meta"]["stale_reason"], "none");
    assert_eq!(summary["data"]["items"][0]["last"], 101.5);

    let assert = ekodash()
        .args(["--format", "json", "report", "--database"])
        .arg(&database)
        .assert()
        .success();
    let report: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(report["data"]["data_points"]["brent_usd"], 101.5);
    assert_eq!(report["data"]["data_points"]["mag7_breadth_positive_share"], 1.0);

    ekodash()
        .args(["--format", "table", "jobs", "--database"])
        .arg(&database)
        .assert()
        .success()
        .stdout(predicate::str::contains("cache_refresh"))
        .stdout(predicate::str::contains("success"));

    Ok(())
}

#[cfg_attr(not(feature = "http-tests"), ignore)]
#[test]
fn summary_reads_through_to_upstream() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _chart = server
        .mock("GET", mockito::Matcher::Regex(r"^/v8/finance/chart/.+$".to_string()))
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(chart_body())
        .create();

    let temp = tempdir()?;
    let instruments = write_instruments(temp.path());

    let assert = ekodash()
        .args(["--format", "json", "summary", "commodities", "--instruments"])
        .arg(&instruments)
        .arg("--database")
        .arg(temp.path().join("missing.db"))
        .env("EKODASH_YAHOO_BASE_URL", server.url())
        .assert()
        .success();

    let value: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
    let data = &value["data"];
    assert_eq!(data["module"], "commodities");
    assert_eq!(data["meta"]["cached"], false);
    assert_eq!(data["meta"]["source"], "yahoo_finance");
    assert_eq!(data["items"][0]["id"], "brent");
    assert_eq!(data["items"][0]["last"], 101.5);
    assert_eq!(data["items"][0]["day_abs"], 1.5);

    Ok(())
}
