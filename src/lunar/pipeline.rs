//! Sequential scrape run: fetch, parse, reference, cross-check, merge, store.

use crate::lunar::cross_validator::{self, CrossValidationSummary};
use crate::lunar::fetch::DocumentSource;
use crate::lunar::merger;
use crate::lunar::model::{DayRecord, ReferenceRecord, SecondaryRecord, SourceKind};
use crate::lunar::primary::PrimaryParser;
use crate::lunar::reference::{self, ReferenceEngine};
use crate::lunar::secondary::SecondaryParser;
use crate::lunar::store::DayStore;
use anyhow::{Result, anyhow};
use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Every day from the first of `start_month` to the last of `end_month`.
pub fn dates_for_year(year: i32, start_month: u32, end_month: u32) -> Result<Vec<NaiveDate>> {
    if !(1..=12).contains(&start_month) || !(1..=12).contains(&end_month) {
        return Err(anyhow!("months must be between 1 and 12"));
    }
    if start_month > end_month {
        return Err(anyhow!(
            "start month {start_month} is after end month {end_month}"
        ));
    }
    let first = NaiveDate::from_ymd_opt(year, start_month, 1)
        .ok_or_else(|| anyhow!("invalid year {year}"))?;
    let last = NaiveDate::from_ymd_opt(year, end_month, 1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| anyhow!("invalid year {year}"))?;
    Ok(first.iter_days().take_while(|d| *d <= last).collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayFailure {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub requested: usize,
    pub parsed: usize,
    pub secondary_found: usize,
    pub reference_found: usize,
    pub saved: usize,
    pub failures: Vec<DayFailure>,
    pub cross_validation: CrossValidationSummary,
}

pub struct Pipeline<'a> {
    source: &'a dyn DocumentSource,
    engine: Option<&'a dyn ReferenceEngine>,
    store: Option<&'a DayStore>,
    with_secondary: bool,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn DocumentSource) -> Self {
        Self {
            source,
            engine: None,
            store: None,
            with_secondary: true,
        }
    }

    pub fn reference(mut self, engine: Option<&'a dyn ReferenceEngine>) -> Self {
        self.engine = engine;
        self
    }

    /// No store means a dry run.
    pub fn store(mut self, store: Option<&'a DayStore>) -> Self {
        self.store = store;
        self
    }

    pub fn secondary(mut self, enabled: bool) -> Self {
        self.with_secondary = enabled;
        self
    }

    fn secondary_for(&self, parser: &SecondaryParser, date: NaiveDate) -> Option<SecondaryRecord> {
        if !self.with_secondary {
            return None;
        }
        match self.source.fetch(SourceKind::Secondary, date) {
            Ok(html) => parser.parse(&html, date),
            Err(err) => {
                warn!("No secondary page for {}: {:#}", date, err);
                None
            }
        }
    }

    fn reference_batch(&self, dates: &[NaiveDate]) -> BTreeMap<NaiveDate, ReferenceRecord> {
        match self.engine {
            Some(engine) => reference::by_date(reference::compute(engine, dates)),
            None => BTreeMap::new(),
        }
    }

    pub fn run(&self, dates: &[NaiveDate]) -> Result<RunSummary> {
        let primary_parser = PrimaryParser::new()?;
        let secondary_parser = SecondaryParser::new()?;
        let references = self.reference_batch(dates);

        let mut summary = RunSummary {
            requested: dates.len(),
            reference_found: references.len(),
            ..RunSummary::default()
        };
        if let Some(store) = self.store {
            for record in references.values() {
                store.save_raw(SourceKind::Reference, record.solar_date, record)?;
            }
        }

        let mut checks = Vec::with_capacity(dates.len());
        for (i, date) in dates.iter().copied().enumerate() {
            info!("Scraping day {}/{}: {}", i + 1, dates.len(), date);

            let primary = match self.source.fetch(SourceKind::Primary, date) {
                Ok(html) => primary_parser.parse(&html, date),
                Err(err) => {
                    error!("Failed to fetch primary page for {}: {:#}", date, err);
                    summary.failures.push(DayFailure {
                        date,
                        reason: format!("fetch failed: {err:#}"),
                    });
                    continue;
                }
            };
            let Some(primary) = primary else {
                summary.failures.push(DayFailure {
                    date,
                    reason: "primary page could not be parsed".to_string(),
                });
                continue;
            };
            summary.parsed += 1;

            let secondary = self.secondary_for(&secondary_parser, date);
            if secondary.is_some() {
                summary.secondary_found += 1;
            }
            let reference = references.get(&date);

            checks.push(cross_validator::validate(
                &primary,
                secondary.as_ref(),
                reference,
            ));
            let merged = merger::merge(&primary, secondary.as_ref(), reference);

            if let Some(store) = self.store {
                store.save_raw(SourceKind::Primary, date, &primary)?;
                if let Some(secondary) = &secondary {
                    store.save_raw(SourceKind::Secondary, date, secondary)?;
                }
                store.save_day(&merged)?;
                summary.saved += 1;
            }
        }

        summary.cross_validation = cross_validator::summarize(&checks);
        if let Some(store) = self.store {
            store.set_metadata("last_scrape_at", &Utc::now().to_rfc3339())?;
        }
        info!(
            "Scrape finished: {} parsed, {} saved, {} failed",
            summary.parsed,
            summary.saved,
            summary.failures.len()
        );
        Ok(summary)
    }
}

/// Re-run the cross-check from records already in the store.
pub fn recheck_stored(store: &DayStore, start: NaiveDate, end: NaiveDate) -> Result<CrossValidationSummary> {
    let primaries: Vec<DayRecord> = store.get_raw_range(SourceKind::Primary, start, end)?;
    let secondary: Vec<SecondaryRecord> = store.get_raw_range(SourceKind::Secondary, start, end)?;
    let reference: Vec<ReferenceRecord> = store.get_raw_range(SourceKind::Reference, start, end)?;
    let secondary = secondary
        .into_iter()
        .map(|record| (record.solar_date, record))
        .collect::<BTreeMap<_, _>>();
    Ok(cross_validator::validate_batch(
        &primaries,
        &secondary,
        &reference::by_date(reference),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lunar::primary::tests::PRIMARY_PAGE;
    use crate::lunar::reference::tests::FixedEngine;
    use crate::lunar::secondary::tests::SECONDARY_PAGE;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct MapSource {
        pages: HashMap<(SourceKind, NaiveDate), String>,
    }

    impl DocumentSource for MapSource {
        fn fetch(&self, kind: SourceKind, date: NaiveDate) -> Result<String> {
            self.pages
                .get(&(kind, date))
                .cloned()
                .ok_or_else(|| anyhow!("404 for {} {}", kind.key(), date))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn jan_first_source() -> MapSource {
        let mut pages = HashMap::new();
        pages.insert((SourceKind::Primary, date(2025, 1, 1)), PRIMARY_PAGE.to_string());
        pages.insert((SourceKind::Secondary, date(2025, 1, 1)), SECONDARY_PAGE.to_string());
        pages.insert((SourceKind::Primary, date(2025, 1, 3)), "   ".to_string());
        MapSource { pages }
    }

    #[test]
    fn year_ranges_cover_whole_months() {
        let days = dates_for_year(2024, 2, 2).expect("february");
        assert_eq!(days.len(), 29);
        assert_eq!(days[28], date(2024, 2, 29));
        assert_eq!(dates_for_year(2025, 1, 12).expect("year").len(), 365);
        assert!(dates_for_year(2025, 5, 4).is_err());
        assert!(dates_for_year(2025, 0, 4).is_err());
    }

    #[test]
    fn run_saves_merged_days_and_counts_failures() {
        let source = jan_first_source();
        let engine = FixedEngine {
            fail: false,
            calls: Cell::new(0),
        };
        let store = DayStore::open_in_memory().expect("store");
        let dates = [date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)];

        let summary = Pipeline::new(&source)
            .reference(Some(&engine))
            .store(Some(&store))
            .run(&dates)
            .expect("run");

        assert_eq!(engine.calls.get(), 1);
        assert_eq!(summary.requested, 3);
        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.secondary_found, 1);
        assert_eq!(summary.reference_found, 3);
        assert_eq!(summary.saved, 1);
        assert_eq!(summary.failures.len(), 2);
        assert!(summary.failures[0].reason.starts_with("fetch failed"));
        assert_eq!(summary.failures[1].date, date(2025, 1, 3));
        assert_eq!(summary.cross_validation.total, 1);
        assert_eq!(summary.cross_validation.critical_count, 0);

        let stored = store.get_day(date(2025, 1, 1)).expect("get").expect("saved");
        assert_eq!(
            stored.source,
            "lichngaytot.com, xemngay.com, lunar-javascript"
        );
        assert!(store.get_metadata("last_scrape_at").expect("meta").is_some());

        let recheck = recheck_stored(&store, date(2025, 1, 1), date(2025, 1, 31)).expect("recheck");
        assert_eq!(recheck.total, 1);
        assert_eq!(recheck.consistent, 1);
    }

    #[test]
    fn dry_run_without_reference_or_secondary_writes_nothing() {
        let source = jan_first_source();
        let summary = Pipeline::new(&source)
            .secondary(false)
            .run(&[date(2025, 1, 1)])
            .expect("run");
        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.saved, 0);
        assert_eq!(summary.secondary_found, 0);
        assert_eq!(summary.reference_found, 0);
        assert_eq!(summary.cross_validation.total, 1);
    }

    #[test]
    fn failing_reference_engine_leaves_days_unchecked_but_saved() {
        let source = jan_first_source();
        let engine = FixedEngine {
            fail: true,
            calls: Cell::new(0),
        };
        let store = DayStore::open_in_memory().expect("store");
        let summary = Pipeline::new(&source)
            .reference(Some(&engine))
            .store(Some(&store))
            .secondary(false)
            .run(&[date(2025, 1, 1)])
            .expect("run");
        assert_eq!(summary.reference_found, 0);
        assert_eq!(summary.saved, 1);
        let stored = store.get_day(date(2025, 1, 1)).expect("get").expect("saved");
        assert_eq!(stored.source, "lichngaytot.com");
    }
}
