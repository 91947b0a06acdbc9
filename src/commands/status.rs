use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::lunar::config::{load_config, resolve_config_path};
use crate::lunar::paths::resolve_paths;
use crate::lunar::reference::NodeLunarEngine;
use crate::lunar::store::DayStore;

include!(concat!(env!("OUT_DIR"), "/fengshui_env_allowlist.rs"));

/// `FENGSHUI_*` variables the binary reads that are set in this environment.
pub fn active_env_overrides() -> Vec<(&'static str, String)> {
    GENERATED_ENV_ALLOWLIST
        .iter()
        .filter_map(|key| match env::var(key) {
            Ok(value) if !value.trim().is_empty() => Some((*key, value)),
            _ => None,
        })
        .collect()
}

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("fengshui_home={}", paths.fengshui_home.display()));
    report.detail(format!("db_path={}", paths.db_path.display()));
    report.detail(format!("export_dir={}", paths.export_dir.display()));
    report.detail(format!("cache_dir={}", paths.cache_dir.display()));
    report.detail(format!("logs_dir={}", paths.logs_dir.display()));
    if let Some(path) = resolve_config_path() {
        report.detail(format!(
            "config_path={} (present={})",
            path.display(),
            path.exists()
        ));
    }

    let cfg = match load_config() {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            report.issue(format!("config invalid: {err:#}"));
            None
        }
    };

    if paths.db_path.exists() {
        let stats = DayStore::open(&paths.db_path)?.stats()?;
        report.detail(format!("db.total_days={}", stats.total_days));
        if let (Some(first), Some(last)) = (stats.first_date, stats.last_date) {
            report.detail(format!("db.date_range={first}..{last}"));
        }
        let dist = &stats.score_distribution;
        report.detail(format!(
            "db.scores excellent={} good={} normal={} bad={} very_bad={}",
            dist.excellent, dist.good, dist.normal, dist.bad, dist.very_bad
        ));
        report.detail(format!("db.raw_records={}", stats.raw_records));
    } else {
        report.detail("db.present=false".to_string());
    }

    if let Some(cfg) = &cfg
        && cfg.reference.enabled
    {
        match NodeLunarEngine::from_config(&cfg.reference).resolved_bin() {
            Some(bin) => report.detail(format!("node_bin={}", bin.display())),
            None => report.issue(format!(
                "reference engine `{}` not found; set FENGSHUI_NODE_BIN or disable the reference",
                cfg.reference.node_bin
            )),
        }
    }

    for (key, value) in active_env_overrides() {
        report.detail(format!("env.{key}={value}"));
    }

    Ok(report)
}
