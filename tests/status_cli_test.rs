use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn status_reports_paths_and_active_env_overrides() {
    let tmp = tempdir().expect("tempdir");
    let node = tmp.path().join("node");
    fs::write(&node, "#!/usr/bin/env bash\nexit 0\n").expect("write fake node");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(&node).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&node, perms).expect("chmod");
    }
    let db = tmp.path().join("custom").join("days.db");

    let output = assert_cmd::cargo::cargo_bin_cmd!("fengshui")
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("FENGSHUI_HOME", tmp.path())
        .env("FENGSHUI_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("FENGSHUI_DB_PATH", &db)
        .env("FENGSHUI_NODE_BIN", &node)
        .args(["--json", "status"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).expect("json report");
    assert_eq!(report["command"], "status");
    assert_eq!(report["ok"], true);
    let details = report["details"]
        .as_array()
        .expect("details")
        .iter()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>();
    assert!(details.contains(&format!("db_path={}", db.display()).as_str()));
    assert!(details.contains(&"db.present=false"));
    assert!(
        details
            .iter()
            .any(|line| line.starts_with("env.FENGSHUI_DB_PATH="))
    );
}

#[test]
fn status_flags_missing_node_and_invalid_config() {
    let tmp = tempdir().expect("tempdir");
    let config = tmp.path().join("fengshui.toml");
    fs::write(&config, "[fetch]\ndelay_min_secs = 5.0\ndelay_max_secs = 1.0\n").expect("write config");

    assert_cmd::cargo::cargo_bin_cmd!("fengshui")
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("FENGSHUI_HOME", tmp.path())
        .env("FENGSHUI_CONFIG_PATH", &config)
        .arg("status")
        .assert()
        .failure()
        .stdout(predicate::str::contains("config invalid"));

    assert_cmd::cargo::cargo_bin_cmd!("fengshui")
        .current_dir(tmp.path())
        .env("HOME", tmp.path())
        .env("FENGSHUI_HOME", tmp.path())
        .env("FENGSHUI_CONFIG_PATH", tmp.path().join("absent.toml"))
        .env("FENGSHUI_NODE_BIN", tmp.path().join("no-such-node"))
        .arg("status")
        .assert()
        .failure()
        .stdout(predicate::str::contains("reference engine"));
}
