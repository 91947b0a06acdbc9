use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;

use crate::commands::{CommandReport, year_bounds};
use crate::lunar::activities::{self, Activity};
use crate::lunar::export::export_day;
use crate::lunar::model::DayRecord;
use crate::lunar::score::DayQuality;
use crate::lunar::paths::resolve_paths;
use crate::lunar::store::DayStore;

#[derive(Debug, Clone, Default)]
pub struct DaysOptions {
    pub date: Option<NaiveDate>,
    pub lunar_month: Option<String>,
    pub can_chi: Option<String>,
    pub good_in_year: Option<i32>,
    pub min_score: u8,
    pub activity: Option<String>,
    pub delete: bool,
    pub export_dir: Option<PathBuf>,
}

/// `2024-12` as lunar year and month.
fn parse_lunar_month(raw: &str) -> Option<(i32, u8)> {
    let (year, month) = raw.trim().split_once('-')?;
    let year = year.parse::<i32>().ok()?;
    let month = month.parse::<u8>().ok()?;
    (1..=12).contains(&month).then_some((year, month))
}

/// `Kỷ Mùi` as stem and branch.
fn parse_can_chi(raw: &str) -> Option<(&str, &str)> {
    let mut parts = raw.split_whitespace();
    let can = parts.next()?;
    let chi = parts.next()?;
    parts.next().is_none().then_some((can, chi))
}

fn good_activities(day: &DayRecord) -> Vec<&'static Activity> {
    let text = day
        .good_activities
        .iter()
        .map(|activity| activity.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    activities::extract_activities(&text)
}

fn describe(day: &DayRecord) -> String {
    let ids = good_activities(day)
        .iter()
        .map(|activity| activity.id)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{} lunar={}/{}/{}{} day={} score={} quality={} star={} truc={} activities=[{}]",
        day.solar_date,
        day.lunar_date.day,
        day.lunar_date.month,
        day.lunar_date.year,
        if day.lunar_date.is_leap_month { "L" } else { "" },
        day.can_chi.day,
        day.day_score.map_or_else(|| "-".to_string(), |s| s.to_string()),
        day.day_score.map_or("-", |s| DayQuality::from_score(s).as_str()),
        day.star28.as_ref().map_or("-", |star| star.name.as_str()),
        day.truc12.as_ref().map_or("-", |truc| truc.name.as_str()),
        ids
    )
}

fn select(store: &DayStore, opts: &DaysOptions, report: &mut CommandReport) -> Result<Option<Vec<DayRecord>>> {
    let selectors = [
        opts.date.is_some(),
        opts.lunar_month.is_some(),
        opts.can_chi.is_some(),
        opts.good_in_year.is_some(),
    ];
    if selectors.iter().filter(|set| **set).count() != 1 {
        report.issue("choose exactly one of --date, --lunar-month, --can-chi or --good");
        return Ok(None);
    }

    if let Some(date) = opts.date {
        return Ok(Some(store.get_day(date)?.into_iter().collect()));
    }
    if let Some(raw) = &opts.lunar_month {
        let Some((year, month)) = parse_lunar_month(raw) else {
            report.issue(format!("invalid lunar month `{raw}`; expected YEAR-MONTH"));
            return Ok(None);
        };
        return Ok(Some(store.get_days_by_lunar_month(year, month)?));
    }
    if let Some(raw) = &opts.can_chi {
        let Some((can, chi)) = parse_can_chi(raw) else {
            report.issue(format!("invalid can chi `{raw}`; expected e.g. \"Kỷ Mùi\""));
            return Ok(None);
        };
        return Ok(Some(store.search_by_can_chi(can, chi)?));
    }
    if let Some(year) = opts.good_in_year {
        let (start, end) = year_bounds(year)?;
        return Ok(Some(store.get_good_days(start, end, opts.min_score)?));
    }
    Ok(None)
}

pub fn run(opts: &DaysOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("days");

    if (opts.delete || opts.export_dir.is_some()) && opts.date.is_none() {
        report.issue("--delete and --export need --date");
        return Ok(report);
    }
    let wanted = match &opts.activity {
        Some(id) => match activities::by_id(id) {
            Some(activity) => Some(activity),
            None => {
                report.issue(format!("unknown activity id `{id}`; see `fengshui activities`"));
                return Ok(report);
            }
        },
        None => None,
    };

    let store = DayStore::open(&paths.db_path)?;
    let Some(mut days) = select(&store, opts, &mut report)? else {
        return Ok(report);
    };
    if let Some(activity) = wanted {
        days.retain(|day| good_activities(day).iter().any(|hit| hit.id == activity.id));
        report.detail(format!("activity={} ({})", activity.id, activity.name));
    }

    report.detail(format!("matches={}", days.len()));
    for day in &days {
        report.detail(describe(day));
    }

    if let Some(date) = opts.date {
        if let Some(dir) = &opts.export_dir
            && let Some(day) = days.first()
        {
            let path = export_day(day, dir)?;
            report.detail(format!("exported={}", path.display()));
        }
        if opts.delete {
            if store.delete_day(date)? {
                report.detail(format!("deleted={date}"));
            } else {
                report.issue(format!("no stored day for {date}"));
            }
        }
    }

    Ok(report)
}
