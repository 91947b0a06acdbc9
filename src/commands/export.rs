use anyhow::Result;
use std::path::PathBuf;

use crate::commands::{CommandReport, year_bounds};
use crate::lunar::export::export_year;
use crate::lunar::paths::resolve_paths;
use crate::lunar::store::DayStore;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub year: i32,
    pub output: Option<PathBuf>,
}

pub fn run(opts: &ExportOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("export");
    let (start, end) = year_bounds(opts.year)?;

    let store = DayStore::open(&paths.db_path)?;
    let days = store.get_days_range(start, end)?;
    if days.is_empty() {
        report.issue(format!("no stored days for {}; run scrape first", opts.year));
        return Ok(report);
    }

    let dir = opts.output.clone().unwrap_or_else(|| paths.export_dir.clone());
    let files = export_year(opts.year, &days, &dir)?;
    report.detail(format!("days={}", days.len()));
    report.detail(format!("compact={}", files.compact.display()));
    report.detail(format!("pretty={}", files.pretty.display()));
    Ok(report)
}
