//! JSON files for the mobile app: one full record per day, or a compact year file.

use crate::lunar::activities::{self, CatalogEntry};
use crate::lunar::model::DayRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactDirection {
    pub n: String,
    pub d: String,
    pub r: u8,
}

/// Short keys keep the bundled year file small. Travel hours, age conflicts,
/// hac-dao hours and provenance are not carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactDay {
    pub d: String,
    pub ld: u8,
    pub lm: u8,
    pub ly: i32,
    pub lp: u8,
    pub dgz: String,
    pub mgz: String,
    pub ygz: String,
    pub nh: String,
    pub s28: Option<String>,
    pub s28g: u8,
    pub t12: Option<String>,
    pub t12g: u8,
    pub tk: Option<String>,
    pub hd: Vec<String>,
    pub dir: Vec<CompactDirection>,
    pub ga: Vec<String>,
    pub ba: Vec<String>,
    pub gs: Vec<String>,
    pub bs: Vec<String>,
    pub sc: Option<u8>,
}

impl From<&DayRecord> for CompactDay {
    fn from(day: &DayRecord) -> Self {
        Self {
            d: day.solar_date.to_string(),
            ld: day.lunar_date.day,
            lm: day.lunar_date.month,
            ly: day.lunar_date.year,
            lp: u8::from(day.lunar_date.is_leap_month),
            dgz: day.can_chi.day.to_string(),
            mgz: day.can_chi.month.to_string(),
            ygz: day.can_chi.year.to_string(),
            nh: day.can_chi.ngu_hanh.to_string(),
            s28: day.star28.as_ref().map(|star| star.name.clone()),
            s28g: u8::from(day.star28.as_ref().is_some_and(|star| star.is_good)),
            t12: day.truc12.as_ref().map(|truc| truc.name.clone()),
            t12g: u8::from(day.truc12.as_ref().is_some_and(|truc| truc.is_good)),
            tk: day.tiet_khi.clone(),
            hd: day
                .hoang_dao_branches()
                .into_iter()
                .map(|chi| chi.to_string())
                .collect(),
            dir: day
                .directions
                .iter()
                .map(|dir| CompactDirection {
                    n: dir.name.clone(),
                    d: dir.direction.clone(),
                    r: dir.rating,
                })
                .collect(),
            ga: day.good_activities.iter().map(|a| a.name.clone()).collect(),
            ba: day.bad_activities.iter().map(|a| a.name.clone()).collect(),
            gs: day.good_stars.clone(),
            bs: day.bad_stars.clone(),
            sc: day.day_score,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct YearExport {
    pub version: &'static str,
    pub year: i32,
    pub generated_at: String,
    pub total_days: usize,
    pub days: Vec<CompactDay>,
    pub activities: BTreeMap<&'static str, CatalogEntry>,
}

impl YearExport {
    pub fn new(year: i32, days: &[DayRecord]) -> Self {
        Self {
            version: EXPORT_VERSION,
            year,
            generated_at: Utc::now().to_rfc3339(),
            total_days: days.len(),
            days: days.iter().map(CompactDay::from).collect(),
            activities: activities::export_reference(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub compact: PathBuf,
    pub pretty: PathBuf,
}

/// Replace `path` in one step so readers never see a half-written file.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

pub fn export_day(day: &DayRecord, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(format!("day_{}.json", day.solar_date));
    let data = serde_json::to_string_pretty(day)?;
    write_atomic(&path, &format!("{data}\n"))?;
    info!("Exported day data to {}", path.display());
    Ok(path)
}

/// Writes `fengshui_<year>.json` and a `.pretty.json` twin.
pub fn export_year(year: i32, days: &[DayRecord], dir: &Path) -> Result<ExportedFiles> {
    let export = YearExport::new(year, days);
    let compact = dir.join(format!("fengshui_{year}.json"));
    let pretty = dir.join(format!("fengshui_{year}.pretty.json"));
    write_atomic(&compact, &serde_json::to_string(&export)?)?;
    write_atomic(&pretty, &serde_json::to_string_pretty(&export)?)?;
    info!(
        "Exported year data to {} ({} days)",
        compact.display(),
        export.total_days
    );
    Ok(ExportedFiles { compact, pretty })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lunar::primary;
    use chrono::NaiveDate;

    fn jan_first() -> DayRecord {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date");
        primary::try_parse(primary::tests::PRIMARY_PAGE, date).expect("fixture parses")
    }

    #[test]
    fn compact_day_uses_short_keys_and_flags() {
        let day = jan_first();
        let value = serde_json::to_value(CompactDay::from(&day)).expect("serialize");
        assert_eq!(value["d"], "2025-01-01");
        assert_eq!(value["ld"], 2);
        assert_eq!(value["lm"], 12);
        assert_eq!(value["ly"], 2024);
        assert_eq!(value["lp"], 0);
        assert_eq!(value["dgz"], "Kỷ Mùi");
        assert_eq!(value["ygz"], "Giáp Thìn");
        assert_eq!(value["nh"], "Thổ");
        assert_eq!(value["s28"], "Tâm");
        assert_eq!(value["s28g"], 0);
        assert_eq!(value["t12"], "Bình");
        assert_eq!(value["t12g"], 1);
        assert_eq!(value["dir"][0]["n"], "Hỷ thần");
        assert!(value.get("source").is_none());
        assert!(value.get("travel_hours").is_none());
    }

    #[test]
    fn missing_star_and_truc_export_as_null_and_zero() {
        let mut day = jan_first();
        day.star28 = None;
        day.truc12 = None;
        let compact = CompactDay::from(&day);
        assert_eq!(compact.s28, None);
        assert_eq!(compact.s28g, 0);
        assert_eq!(compact.t12g, 0);
    }

    #[test]
    fn year_export_writes_compact_and_pretty_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let files = export_year(2025, &[jan_first()], &tmp.path().join("export")).expect("export");

        let compact = fs::read_to_string(&files.compact).expect("compact file");
        assert!(!compact.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&compact).expect("json");
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["year"], 2025);
        assert_eq!(value["total_days"], 1);
        assert_eq!(value["days"][0]["d"], "2025-01-01");
        assert_eq!(value["activities"]["cuoi_hoi"]["c"], "family");

        let pretty = fs::read_to_string(&files.pretty).expect("pretty file");
        assert!(files.pretty.ends_with("fengshui_2025.pretty.json"));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&pretty).expect("json")["total_days"],
            1
        );
    }

    #[test]
    fn export_day_keeps_the_full_record() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let day = jan_first();
        let path = export_day(&day, tmp.path()).expect("export");
        assert!(path.ends_with("day_2025-01-01.json"));
        let back: DayRecord =
            serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(back, day);
    }
}
