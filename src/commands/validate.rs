use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, write_json_report, year_bounds};
use crate::lunar::config::load_config;
use crate::lunar::lunar_validator;
use crate::lunar::model::{DayRecord, SourceKind};
use crate::lunar::paths::resolve_paths;
use crate::lunar::reference::{self, NodeLunarEngine};
use crate::lunar::store::DayStore;

#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub year: i32,
    pub strict: bool,
    pub merged: bool,
    pub output: Option<PathBuf>,
}

pub fn run(opts: &ValidateOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("validate");
    let (start, end) = year_bounds(opts.year)?;

    let store = DayStore::open(&paths.db_path)?;
    let days: Vec<DayRecord> = if opts.merged {
        store.get_days_range(start, end)?
    } else {
        store.get_raw_range(SourceKind::Primary, start, end)?
    };
    report.detail(format!("year={}", opts.year));
    report.detail(format!(
        "records={}",
        if opts.merged { "merged" } else { "primary" }
    ));
    if days.is_empty() {
        report.issue(format!("no stored records for {}", opts.year));
        return Ok(report);
    }

    let dates = days.iter().map(|day| day.solar_date).collect::<Vec<_>>();
    let engine = NodeLunarEngine::from_config(&cfg.reference);
    let references = reference::by_date(reference::compute(&engine, &dates));
    if references.is_empty() {
        report.issue("reference engine returned no data; check node and lunar-javascript");
    }

    let strict = opts.strict || cfg.validation.strict_month;
    let summary = lunar_validator::validate_batch(&days, &references, strict);

    report.detail(format!("strict={strict}"));
    report.detail(format!("total={}", summary.total));
    report.detail(format!("valid={}", summary.valid));
    report.detail(format!("invalid={}", summary.invalid));
    report.detail(format!("warning_days={}", summary.warnings_count));
    report.detail(format!("accuracy={:.2}%", summary.accuracy));
    for day in summary.errors.iter().take(10) {
        report.detail(format!("invalid {}: {}", day.date, day.errors.join("; ")));
    }

    if let Some(path) = &opts.output {
        write_json_report(path, &summary)?;
        report.detail(format!("output={}", path.display()));
    }

    if summary.invalid > 0 {
        report.issue(format!(
            "{} of {} days failed lunar validation",
            summary.invalid, summary.total
        ));
    }

    Ok(report)
}
