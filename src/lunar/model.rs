use crate::lunar::vocab::{Branch, Element, Stem};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a record came from. The labels double as provenance tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Primary,
    Secondary,
    Reference,
}

impl SourceKind {
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Primary => "lichngaytot.com",
            SourceKind::Secondary => "xemngay.com",
            SourceKind::Reference => "lunar-javascript",
        }
    }

    /// Key used for per-source storage and cache directories.
    pub fn key(self) -> &'static str {
        match self {
            SourceKind::Primary => "primary",
            SourceKind::Secondary => "secondary",
            SourceKind::Reference => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarDate {
    pub day: u8,
    pub month: u8,
    pub year: i32,
    #[serde(default)]
    pub is_leap_month: bool,
}

impl LunarDate {
    pub fn is_valid_day(day: u32) -> bool {
        (1..=30).contains(&day)
    }

    pub fn is_valid_month(month: u32) -> bool {
        (1..=12).contains(&month)
    }

    /// Lunar year for a day whose lunar month was parsed from a page. Months 11
    /// and 12 seen in January or February still belong to the previous year.
    pub fn year_for(solar_date: NaiveDate, lunar_month: u8) -> i32 {
        if lunar_month > 10 && solar_date.month() < 3 {
            solar_date.year() - 1
        } else {
            solar_date.year()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanChi {
    pub can: Stem,
    pub chi: Branch,
}

impl CanChi {
    pub const fn new(can: Stem, chi: Branch) -> Self {
        Self { can, chi }
    }
}

impl fmt::Display for CanChi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.can, self.chi)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanChiInfo {
    pub year: CanChi,
    pub month: CanChi,
    pub day: CanChi,
    pub ngu_hanh: Element,
}

impl CanChiInfo {
    /// The day element is fixed by the day stem.
    pub fn from_pairs(year: CanChi, month: CanChi, day: CanChi) -> Self {
        Self {
            year,
            month,
            day,
            ngu_hanh: day.can.element(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star28Info {
    pub name: String,
    pub is_good: bool,
    #[serde(default)]
    pub meaning: Option<String>,
}

/// Constellation detail only the secondary source publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Star28Detail {
    pub name: String,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub animal: Option<String>,
    pub is_good: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truc12Info {
    pub name: String,
    pub is_good: bool,
    #[serde(default)]
    pub meaning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourInfo {
    pub chi: Branch,
    pub time_range: String,
    pub is_hoang_dao: bool,
    pub is_hac_dao: bool,
}

impl HourInfo {
    pub fn new(chi: Branch, hoang_dao: bool) -> Self {
        Self {
            chi,
            time_range: chi.time_range(),
            is_hoang_dao: hoang_dao,
            is_hac_dao: !hoang_dao,
        }
    }
}

/// Twelve hour entries in branch order, auspicious exactly where `hoang_dao` says so.
pub fn day_hours(hoang_dao: &[Branch]) -> Vec<HourInfo> {
    Branch::ALL
        .into_iter()
        .map(|chi| HourInfo::new(chi, hoang_dao.contains(&chi)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionInfo {
    pub name: String,
    pub direction: String,
    pub rating: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityInfo {
    pub name: String,
    pub category: String,
}

/// Giờ xuất hành theo Lý Thuần Phong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelHour {
    pub time_range: String,
    pub name: String,
    pub is_good: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingAges {
    pub xung_ngay: Vec<String>,
    pub xung_thang: Vec<String>,
}

/// One calendar day as published by the primary source, and after merging
/// the canonical record stored for the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub solar_date: NaiveDate,
    pub lunar_date: LunarDate,
    pub can_chi: CanChiInfo,
    #[serde(default)]
    pub tiet_khi: Option<String>,
    #[serde(default)]
    pub star28: Option<Star28Info>,
    #[serde(default)]
    pub truc12: Option<Truc12Info>,
    #[serde(default)]
    pub hoang_dao_hours: Vec<HourInfo>,
    #[serde(default)]
    pub directions: Vec<DirectionInfo>,
    #[serde(default)]
    pub good_activities: Vec<ActivityInfo>,
    #[serde(default)]
    pub bad_activities: Vec<ActivityInfo>,
    #[serde(default)]
    pub good_stars: Vec<String>,
    #[serde(default)]
    pub bad_stars: Vec<String>,
    #[serde(default)]
    pub travel_hours: Vec<TravelHour>,
    #[serde(default)]
    pub conflicting_ages: Option<ConflictingAges>,
    #[serde(default)]
    pub day_score: Option<u8>,
    pub source: String,
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl DayRecord {
    pub fn hoang_dao_branches(&self) -> Vec<Branch> {
        self.hoang_dao_hours
            .iter()
            .filter(|hour| hour.is_hoang_dao)
            .map(|hour| hour.chi)
            .collect()
    }
}

/// Can-chi as the secondary source prints it. Only the day pair is required;
/// a missing month or year pair stays missing instead of being defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryCanChi {
    pub day: CanChi,
    #[serde(default)]
    pub month: Option<CanChi>,
    #[serde(default)]
    pub year: Option<CanChi>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecondaryRecord {
    pub solar_date: NaiveDate,
    #[serde(default)]
    pub lunar_date: Option<LunarDate>,
    #[serde(default)]
    pub can_chi: Option<SecondaryCanChi>,
    #[serde(default)]
    pub star28: Option<Star28Detail>,
    #[serde(default)]
    pub truc12: Option<Truc12Info>,
    #[serde(default)]
    pub directions: Vec<DirectionInfo>,
    #[serde(default)]
    pub good_activities: Vec<String>,
    #[serde(default)]
    pub bad_activities: Vec<String>,
    pub source: String,
}

/// Calculated ground truth for one solar date, already transliterated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub solar_date: NaiveDate,
    pub lunar_date: LunarDate,
    pub year: CanChi,
    pub month: CanChi,
    pub day: CanChi,
    #[serde(default)]
    pub tiet_khi: Option<String>,
    #[serde(default)]
    pub star28: Option<String>,
    #[serde(default)]
    pub truc12: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn late_lunar_month_in_early_solar_year_rolls_year_back() {
        assert_eq!(LunarDate::year_for(date(2025, 1, 15), 11), 2024);
        assert_eq!(LunarDate::year_for(date(2025, 1, 1), 12), 2024);
        assert_eq!(LunarDate::year_for(date(2025, 2, 20), 12), 2024);
    }

    #[test]
    fn mid_year_lunar_month_keeps_solar_year() {
        assert_eq!(LunarDate::year_for(date(2025, 7, 10), 5), 2025);
        assert_eq!(LunarDate::year_for(date(2025, 3, 1), 12), 2025);
        assert_eq!(LunarDate::year_for(date(2025, 1, 29), 1), 2025);
    }

    #[test]
    fn day_hours_flags_are_always_complementary() {
        let hours = day_hours(&[Branch::Ty, Branch::Mao, Branch::Hoi]);
        assert_eq!(hours.len(), 12);
        for hour in &hours {
            assert_ne!(hour.is_hoang_dao, hour.is_hac_dao, "{:?}", hour.chi);
        }
        assert!(hours[0].is_hoang_dao);
        assert!(!hours[1].is_hoang_dao);
        assert_eq!(hours[0].time_range, "23:00 - 01:00");
    }

    #[test]
    fn can_chi_info_derives_element_from_day_stem() {
        let info = CanChiInfo::from_pairs(
            CanChi::new(Stem::Giap, Branch::Thin),
            CanChi::new(Stem::Binh, Branch::Ty),
            CanChi::new(Stem::Ky, Branch::Mui),
        );
        assert_eq!(info.ngu_hanh, Element::Tho);
        assert_eq!(info.day.to_string(), "Kỷ Mùi");
    }

    #[test]
    fn can_chi_serializes_with_vietnamese_names() {
        let pair = CanChi::new(Stem::At, Branch::Ti);
        let json = serde_json::to_value(pair).expect("serialize");
        assert_eq!(json, serde_json::json!({"can": "Ất", "chi": "Tỵ"}));
        let back: CanChi =
            serde_json::from_value(serde_json::json!({"can": "Ất", "chi": "Tị"})).expect("parse");
        assert_eq!(back, pair);
    }
}
