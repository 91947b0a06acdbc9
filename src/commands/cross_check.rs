use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, write_json_report, year_bounds};
use crate::lunar::paths::resolve_paths;
use crate::lunar::pipeline::recheck_stored;
use crate::lunar::store::DayStore;

#[derive(Debug, Clone)]
pub struct CrossCheckOptions {
    pub year: i32,
    pub output: Option<PathBuf>,
}

pub fn run(opts: &CrossCheckOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("cross-check");
    let (start, end) = year_bounds(opts.year)?;

    let store = DayStore::open(&paths.db_path)?;
    let summary = recheck_stored(&store, start, end)?;

    report.detail(format!("year={}", opts.year));
    report.detail(format!("total={}", summary.total));
    report.detail(format!("consistent={}", summary.consistent));
    report.detail(format!("inconsistent={}", summary.inconsistent));
    report.detail(format!("critical_days={}", summary.critical_count));
    report.detail(format!("warning_days={}", summary.warning_count));

    for day in summary.critical_errors.iter().take(10) {
        let fields = day
            .discrepancies
            .iter()
            .map(|item| item.field.as_str())
            .collect::<Vec<_>>()
            .join(",");
        report.detail(format!("critical {} fields={}", day.date, fields));
    }

    if let Some(path) = &opts.output {
        write_json_report(path, &summary)?;
        report.detail(format!("output={}", path.display()));
    }

    if summary.total == 0 {
        report.issue(format!("no stored primary records for {}", opts.year));
    } else if summary.critical_count > 0 {
        report.issue(format!(
            "{} days have critical discrepancies",
            summary.critical_count
        ));
    }

    Ok(report)
}
