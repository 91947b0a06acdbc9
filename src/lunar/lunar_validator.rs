//! Two-way accuracy audit of parsed lunar fields against the calculated reference.

use crate::lunar::model::{DayRecord, ReferenceRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

const MONTH_CONVENTION_NOTE: &str = " (may differ due to Jie Qi calculation)";

/// Every lunar field the audit looks at, as plain strings and numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LunarSnapshot {
    pub lunar_day: u8,
    pub lunar_month: u8,
    pub lunar_year: i32,
    pub day_can: String,
    pub day_chi: String,
    pub month_can: String,
    pub month_chi: String,
    pub year_can: String,
    pub year_chi: String,
    pub tiet_khi: Option<String>,
}

impl From<&DayRecord> for LunarSnapshot {
    fn from(record: &DayRecord) -> Self {
        Self {
            lunar_day: record.lunar_date.day,
            lunar_month: record.lunar_date.month,
            lunar_year: record.lunar_date.year,
            day_can: record.can_chi.day.can.to_string(),
            day_chi: record.can_chi.day.chi.to_string(),
            month_can: record.can_chi.month.can.to_string(),
            month_chi: record.can_chi.month.chi.to_string(),
            year_can: record.can_chi.year.can.to_string(),
            year_chi: record.can_chi.year.chi.to_string(),
            tiet_khi: record.tiet_khi.clone(),
        }
    }
}

impl From<&ReferenceRecord> for LunarSnapshot {
    fn from(record: &ReferenceRecord) -> Self {
        Self {
            lunar_day: record.lunar_date.day,
            lunar_month: record.lunar_date.month,
            lunar_year: record.lunar_date.year,
            day_can: record.day.can.to_string(),
            day_chi: record.day.chi.to_string(),
            month_can: record.month.can.to_string(),
            month_chi: record.month.chi.to_string(),
            year_can: record.year.can.to_string(),
            year_chi: record.year.chi.to_string(),
            tiet_khi: record.tiet_khi.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LunarValidationResult {
    pub solar_date: NaiveDate,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub expected: Option<LunarSnapshot>,
    pub actual: LunarSnapshot,
}

#[derive(Default)]
struct Findings {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Findings {
    fn check<T: PartialEq + Display>(&mut self, label: &str, expected: T, actual: T) {
        if expected != actual {
            self.errors
                .push(format!("{label}: expected {expected}, got {actual}"));
        }
    }

    /// Month pairs depend on whether months turn at solar terms or at new moons.
    fn check_month<T: PartialEq + Display>(&mut self, label: &str, expected: T, actual: T, strict: bool) {
        if expected == actual {
            return;
        }
        if strict {
            self.errors
                .push(format!("{label}: expected {expected}, got {actual}"));
        } else {
            self.warnings.push(format!(
                "{label}: expected {expected}, got {actual}{MONTH_CONVENTION_NOTE}"
            ));
        }
    }
}

pub fn validate_day(
    primary: &DayRecord,
    reference: Option<&ReferenceRecord>,
    strict: bool,
) -> LunarValidationResult {
    let actual = LunarSnapshot::from(primary);
    let Some(reference) = reference else {
        return LunarValidationResult {
            solar_date: primary.solar_date,
            is_valid: false,
            errors: vec!["Failed to get reference lunar data".to_string()],
            warnings: Vec::new(),
            expected: None,
            actual,
        };
    };

    let mut findings = Findings::default();
    let ours = &primary.lunar_date;
    let theirs = &reference.lunar_date;
    findings.check("Lunar day", theirs.day, ours.day);
    findings.check("Lunar month", theirs.month, ours.month);
    findings.check("Lunar year", theirs.year, ours.year);
    findings.check("Day Can", reference.day.can, primary.can_chi.day.can);
    findings.check("Day Chi", reference.day.chi, primary.can_chi.day.chi);
    findings.check_month("Month Can", reference.month.can, primary.can_chi.month.can, strict);
    findings.check_month("Month Chi", reference.month.chi, primary.can_chi.month.chi, strict);
    findings.check("Year Can", reference.year.can, primary.can_chi.year.can);
    findings.check("Year Chi", reference.year.chi, primary.can_chi.year.chi);

    LunarValidationResult {
        solar_date: primary.solar_date,
        is_valid: findings.errors.is_empty(),
        errors: findings.errors,
        warnings: findings.warnings,
        expected: Some(LunarSnapshot::from(reference)),
        actual,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayErrors {
    pub date: NaiveDate,
    pub errors: Vec<String>,
    pub expected: Option<LunarSnapshot>,
    pub actual: LunarSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayWarnings {
    pub date: NaiveDate,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LunarValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub warnings_count: usize,
    /// Percentage of valid days, two decimals.
    pub accuracy: f64,
    pub errors: Vec<DayErrors>,
    pub warnings: Vec<DayWarnings>,
}

pub fn summarize(results: &[LunarValidationResult]) -> LunarValidationSummary {
    let mut summary = LunarValidationSummary {
        total: results.len(),
        ..LunarValidationSummary::default()
    };
    for result in results {
        if result.is_valid {
            summary.valid += 1;
        } else {
            summary.invalid += 1;
            summary.errors.push(DayErrors {
                date: result.solar_date,
                errors: result.errors.clone(),
                expected: result.expected.clone(),
                actual: result.actual.clone(),
            });
        }
        if !result.warnings.is_empty() {
            summary.warnings.push(DayWarnings {
                date: result.solar_date,
                warnings: result.warnings.clone(),
            });
        }
    }
    summary.warnings_count = summary.warnings.len();
    if summary.total > 0 {
        let ratio = summary.valid as f64 / summary.total as f64 * 100.0;
        summary.accuracy = (ratio * 100.0).round() / 100.0;
    }
    summary
}

pub fn validate_batch(
    days: &[DayRecord],
    reference: &BTreeMap<NaiveDate, ReferenceRecord>,
    strict: bool,
) -> LunarValidationSummary {
    let results = days
        .iter()
        .map(|day| validate_day(day, reference.get(&day.solar_date), strict))
        .collect::<Vec<_>>();
    summarize(&results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lunar::model::CanChi;
    use crate::lunar::primary;
    use crate::lunar::vocab::{Branch, Stem};

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
    }

    fn primary_record() -> DayRecord {
        primary::try_parse(primary::tests::PRIMARY_PAGE, jan_first()).expect("fixture parses")
    }

    fn reference_record() -> ReferenceRecord {
        let record = primary_record();
        ReferenceRecord {
            solar_date: record.solar_date,
            lunar_date: record.lunar_date,
            year: record.can_chi.year,
            month: record.can_chi.month,
            day: record.can_chi.day,
            tiet_khi: Some("Đông chí".to_string()),
            star28: None,
            truc12: None,
        }
    }

    #[test]
    fn matching_record_is_valid() {
        let result = validate_day(&primary_record(), Some(&reference_record()), true);
        assert!(result.is_valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
        let expected = result.expected.expect("expected snapshot");
        assert_eq!(expected, result.actual);
        assert_eq!(expected.day_can, "Kỷ");
        assert_eq!(expected.day_chi, "Mùi");
    }

    #[test]
    fn missing_reference_is_invalid() {
        let result = validate_day(&primary_record(), None, false);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Failed to get reference lunar data"]);
        assert!(result.expected.is_none());
    }

    #[test]
    fn month_can_chi_mismatch_is_warning_unless_strict() {
        let mut reference = reference_record();
        reference.month = CanChi::new(Stem::Dinh, Branch::Suu);

        let lenient = validate_day(&primary_record(), Some(&reference), false);
        assert!(lenient.is_valid);
        assert!(lenient.errors.is_empty());
        assert_eq!(
            lenient.warnings,
            vec![
                "Month Can: expected Đinh, got Bính (may differ due to Jie Qi calculation)",
                "Month Chi: expected Sửu, got Tý (may differ due to Jie Qi calculation)",
            ]
        );

        let strict = validate_day(&primary_record(), Some(&reference), true);
        assert!(!strict.is_valid);
        assert_eq!(strict.errors.len(), 2);
        assert!(strict.warnings.is_empty());
    }

    #[test]
    fn lunar_and_day_mismatches_are_always_errors() {
        let mut reference = reference_record();
        reference.lunar_date.day = 3;
        reference.lunar_date.year = 2025;
        reference.day = CanChi::new(Stem::Canh, Branch::Mui);
        let result = validate_day(&primary_record(), Some(&reference), false);
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec![
                "Lunar day: expected 3, got 2",
                "Lunar year: expected 2025, got 2024",
                "Day Can: expected Canh, got Kỷ",
            ]
        );
    }

    #[test]
    fn batch_reports_accuracy_and_full_error_detail() {
        let good = primary_record();
        let mut bad = good.clone();
        bad.solar_date = NaiveDate::from_ymd_opt(2025, 1, 2).expect("valid date");
        let mut drifted = good.clone();
        drifted.solar_date = NaiveDate::from_ymd_opt(2025, 1, 3).expect("valid date");

        let mut drifted_reference = reference_record();
        drifted_reference.solar_date = drifted.solar_date;
        drifted_reference.month = CanChi::new(Stem::Dinh, Branch::Suu);
        let references = BTreeMap::from([
            (good.solar_date, reference_record()),
            (drifted.solar_date, drifted_reference),
        ]);

        let summary = validate_batch(&[good, bad, drifted], &references, false);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.valid, 2);
        assert_eq!(summary.invalid, 1);
        assert_eq!(summary.warnings_count, 1);
        assert!((summary.accuracy - 66.67).abs() < f64::EPSILON);
        assert_eq!(summary.errors[0].date.to_string(), "2025-01-02");
        assert_eq!(summary.errors[0].actual.lunar_day, 2);
        assert_eq!(summary.warnings[0].date.to_string(), "2025-01-03");
    }

    #[test]
    fn empty_batch_has_zero_accuracy() {
        let summary = validate_batch(&[], &BTreeMap::new(), true);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.accuracy, 0.0);
    }
}
