use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const NODE_OUTPUT: &str = r#"[{"solar_date":"2025-01-01","lunar_day":2,"lunar_month":12,"lunar_year":2024,"is_leap_month":false,"year_gan":"甲","year_zhi":"辰","month_gan":"丙","month_zhi":"子","day_gan":"己","day_zhi":"未","jie_qi":null}]"#;

fn cache_fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/cache")
}

fn write_executable(path: &Path, script: &str) {
    fs::write(path, script).expect("write fake binary");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms).expect("chmod");
    }
}

fn write_fake_node(path: &Path) {
    let script = format!("#!/usr/bin/env bash\ncat >/dev/null\ncat <<'JSON'\n{NODE_OUTPUT}\nJSON\n");
    write_executable(path, &script);
}

fn fengshui(home: &Path, node: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("fengshui");
    cmd.current_dir(home)
        .env("HOME", home)
        .env("FENGSHUI_HOME", home)
        .env("FENGSHUI_CONFIG_PATH", home.join("absent.toml"))
        .env("FENGSHUI_NODE_BIN", node)
        .env("FENGSHUI_LOG", "warn");
    cmd
}

#[test]
fn scrape_from_cache_then_export_cross_check_and_validate() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);

    fengshui(tmp.path(), &node)
        .args(["scrape", "--date", "2025-01-01", "--from-cache"])
        .arg(cache_fixtures())
        .assert()
        .success()
        .stdout(predicate::str::contains("days.saved=1"))
        .stdout(predicate::str::contains("days.reference=1"));

    assert!(tmp.path().join("data/fengshui.db").is_file());
    let audit = fs::read_to_string(tmp.path().join("logs/audit.log")).expect("audit log");
    assert!(audit.contains("\"phase\":\"scrape\""));

    fengshui(tmp.path(), &node)
        .args(["export", "--year", "2025"])
        .assert()
        .success();
    let compact = fs::read_to_string(tmp.path().join("data/export/fengshui_2025.json"))
        .expect("compact export");
    let value: serde_json::Value = serde_json::from_str(&compact).expect("json");
    assert_eq!(value["total_days"], 1);
    assert_eq!(value["days"][0]["dgz"], "Kỷ Mùi");
    assert!(tmp.path().join("data/export/fengshui_2025.pretty.json").is_file());

    let report = tmp.path().join("cross.json");
    fengshui(tmp.path(), &node)
        .args(["cross-check", "--year", "2025", "--output"])
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("critical_days=0"));
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(summary["total"], 1);

    fengshui(tmp.path(), &node)
        .args(["--json", "validate", "--year", "2025", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("accuracy=100.00%"));
}

#[test]
fn scrape_fails_when_no_day_can_be_fetched() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);
    let empty_cache = tmp.path().join("empty-cache");
    fs::create_dir_all(&empty_cache).expect("mkdir cache");

    fengshui(tmp.path(), &node)
        .args(["scrape", "--date", "2025-01-02", "--no-reference", "--from-cache"])
        .arg(&empty_cache)
        .assert()
        .failure()
        .stdout(predicate::str::contains("no days could be fetched and parsed"));
}

#[test]
fn dry_run_does_not_create_a_database() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);

    fengshui(tmp.path(), &node)
        .args(["scrape", "--date", "2025-01-01", "--dry-run", "--no-secondary", "--from-cache"])
        .arg(cache_fixtures())
        .assert()
        .success()
        .stdout(predicate::str::contains("days.parsed=1"))
        .stdout(predicate::str::contains("days.saved=0"));
    assert!(!tmp.path().join("data/fengshui.db").exists());
}

#[test]
fn validate_fails_when_reference_engine_errors() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);
    fengshui(tmp.path(), &node)
        .args(["scrape", "--date", "2025-01-01", "--no-reference", "--from-cache"])
        .arg(cache_fixtures())
        .assert()
        .success();

    let broken = tmp.path().join("node-broken");
    write_executable(&broken, "#!/usr/bin/env bash\necho 'Cannot find module lunar-javascript' >&2\nexit 1\n");
    fengshui(tmp.path(), &broken)
        .args(["validate", "--year", "2025"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("reference engine returned no data"))
        .stdout(predicate::str::contains("Failed to get reference lunar data"));
}

#[test]
fn export_without_data_reports_issue() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);
    fengshui(tmp.path(), &node)
        .args(["export", "--year", "2030"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("run scrape first"));
}

#[test]
fn days_queries_export_and_delete_stored_records() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);
    fengshui(tmp.path(), &node)
        .args(["scrape", "--date", "2025-01-01", "--from-cache"])
        .arg(cache_fixtures())
        .assert()
        .success();

    fengshui(tmp.path(), &node)
        .args(["days", "--can-chi", "Kỷ Mùi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches=1"))
        .stdout(predicate::str::contains("2025-01-01 lunar=2/12/2024"));

    fengshui(tmp.path(), &node)
        .args(["days", "--lunar-month", "2024-12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches=1"));

    fengshui(tmp.path(), &node)
        .args(["days", "--good", "2025", "--min-score", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("matches=1"));

    fengshui(tmp.path(), &node)
        .args(["days", "--date", "2025-01-01", "--activity", "no_such_activity"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown activity id"));

    let out = tmp.path().join("single");
    fengshui(tmp.path(), &node)
        .args(["days", "--date", "2025-01-01", "--export"])
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("day_2025-01-01.json").is_file());

    fengshui(tmp.path(), &node)
        .args(["days", "--date", "2025-01-01", "--delete"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted=2025-01-01"));
    fengshui(tmp.path(), &node)
        .args(["days", "--date", "2025-01-01", "--delete"])
        .assert()
        .failure();
}

#[test]
fn activities_lists_catalog_by_category() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    write_fake_node(&node);
    fengshui(tmp.path(), &node)
        .args(["activities", "--category", "water"])
        .assert()
        .success()
        .stdout(predicate::str::contains("count=3"))
        .stdout(predicate::str::contains("dao_gieng Đào giếng (Dig well) [Thủy]"));

    fengshui(tmp.path(), &node)
        .args(["activities", "--category", "weather"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("unknown category"));
}
