use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::lunar::audit;
use crate::lunar::config::load_config;
use crate::lunar::fetch::{CacheDirSource, DocumentSource, HttpSource};
use crate::lunar::paths::resolve_paths;
use crate::lunar::pipeline::{Pipeline, dates_for_year};
use crate::lunar::reference::{NodeLunarEngine, ReferenceEngine};
use crate::lunar::store::DayStore;

#[derive(Debug, Clone)]
pub struct ScrapeOptions {
    pub year: Option<i32>,
    pub start_month: u32,
    pub end_month: u32,
    pub date: Option<NaiveDate>,
    pub from_cache: Option<PathBuf>,
    pub save_cache: bool,
    pub no_secondary: bool,
    pub no_reference: bool,
    pub dry_run: bool,
}

pub fn run(opts: &ScrapeOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("scrape");

    let dates = match (opts.date, opts.year) {
        (Some(date), _) => vec![date],
        (None, Some(year)) => match dates_for_year(year, opts.start_month, opts.end_month) {
            Ok(dates) => dates,
            Err(err) => {
                report.issue(format!("invalid date range: {err}"));
                return Ok(report);
            }
        },
        (None, None) => {
            report.issue("nothing to scrape; pass --year or --date");
            return Ok(report);
        }
    };

    let source: Box<dyn DocumentSource> = match &opts.from_cache {
        Some(dir) => {
            report.detail(format!("source=cache:{}", dir.display()));
            Box::new(CacheDirSource::new(dir))
        }
        None => {
            let cache = opts.save_cache.then(|| paths.cache_dir.clone());
            report.detail("source=http".to_string());
            Box::new(HttpSource::new(&cfg, cache)?)
        }
    };

    let engine = NodeLunarEngine::from_config(&cfg.reference);
    let use_reference = cfg.reference.enabled && !opts.no_reference;
    let store = if opts.dry_run {
        report.detail("scrape.dry_run=true".to_string());
        None
    } else {
        Some(DayStore::open(&paths.db_path)?)
    };

    let summary = Pipeline::new(source.as_ref())
        .reference(use_reference.then_some(&engine as &dyn ReferenceEngine))
        .store(store.as_ref())
        .secondary(cfg.sources.secondary_enabled && !opts.no_secondary)
        .run(&dates)?;

    report.detail(format!("db_path={}", paths.db_path.display()));
    report.detail(format!("days.requested={}", summary.requested));
    report.detail(format!("days.parsed={}", summary.parsed));
    report.detail(format!("days.saved={}", summary.saved));
    report.detail(format!("days.secondary={}", summary.secondary_found));
    report.detail(format!("days.reference={}", summary.reference_found));
    report.detail(format!("days.failed={}", summary.failures.len()));
    for failure in &summary.failures {
        report.detail(format!("failed {}: {}", failure.date, failure.reason));
    }

    let checks = &summary.cross_validation;
    report.detail(format!(
        "cross_check consistent={} inconsistent={} critical_days={} warning_days={}",
        checks.consistent, checks.inconsistent, checks.critical_count, checks.warning_count
    ));
    for day in &checks.critical_errors {
        for item in &day.discrepancies {
            report.detail(format!(
                "critical {} {}: {} vs {}",
                day.date,
                item.field.as_str(),
                item.source1,
                item.source2
            ));
        }
    }

    if use_reference && summary.reference_found == 0 && !dates.is_empty() {
        report.detail("reference engine returned no data; days were not checked against it");
    }
    if summary.requested > 0 && summary.parsed == 0 {
        report.issue("no days could be fetched and parsed");
    }

    let status = if report.ok { "ok" } else { "failed" };
    let message = format!(
        "requested={} parsed={} saved={} failed={}",
        summary.requested,
        summary.parsed,
        summary.saved,
        summary.failures.len()
    );
    if let Err(err) = audit::append_event(&paths, "scrape", status, &message) {
        report.detail(format!("audit log unavailable: {err:#}"));
    }

    Ok(report)
}
