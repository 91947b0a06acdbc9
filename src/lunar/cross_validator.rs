//! Field-by-field comparison of the primary record against the secondary page
//! and the calculated reference. Disagreement is data, never an error.

use crate::lunar::model::{CanChi, DayRecord, ReferenceRecord, SecondaryRecord, SourceKind};
use crate::lunar::vocab;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

const MAX_WARNING_DAYS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyField {
    LunarDay,
    LunarMonth,
    DayCanChi,
    YearCanChi,
    MonthCanChi,
    #[serde(rename = "star28_name")]
    Star28Name,
    #[serde(rename = "truc12_name")]
    Truc12Name,
    Direction,
}

/// Severity is a property of the field, not of the particular mismatch.
pub const FIELD_SEVERITY: [(DiscrepancyField, Severity); 8] = [
    (DiscrepancyField::LunarDay, Severity::Critical),
    (DiscrepancyField::LunarMonth, Severity::Critical),
    (DiscrepancyField::DayCanChi, Severity::Critical),
    (DiscrepancyField::YearCanChi, Severity::Critical),
    (DiscrepancyField::MonthCanChi, Severity::Warning),
    (DiscrepancyField::Star28Name, Severity::Warning),
    (DiscrepancyField::Truc12Name, Severity::Warning),
    (DiscrepancyField::Direction, Severity::Info),
];

impl DiscrepancyField {
    pub fn as_str(self) -> &'static str {
        match self {
            DiscrepancyField::LunarDay => "lunar_day",
            DiscrepancyField::LunarMonth => "lunar_month",
            DiscrepancyField::DayCanChi => "day_can_chi",
            DiscrepancyField::YearCanChi => "year_can_chi",
            DiscrepancyField::MonthCanChi => "month_can_chi",
            DiscrepancyField::Star28Name => "star28_name",
            DiscrepancyField::Truc12Name => "truc12_name",
            DiscrepancyField::Direction => "direction",
        }
    }

    pub fn severity(self) -> Severity {
        FIELD_SEVERITY
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, severity)| *severity)
            .unwrap_or(Severity::Info)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyItem {
    pub field: DiscrepancyField,
    pub source1_value: String,
    pub source2_value: String,
    pub severity: Severity,
    pub notes: Option<String>,
}

impl DiscrepancyItem {
    fn new(field: DiscrepancyField, source1: impl ToString, source2: impl ToString, notes: &str) -> Self {
        Self {
            field,
            source1_value: source1.to_string(),
            source2_value: source2.to_string(),
            severity: field.severity(),
            notes: Some(notes.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrossValidationResult {
    pub solar_date: NaiveDate,
    pub source1: String,
    pub source2: String,
    pub is_consistent: bool,
    pub discrepancies: Vec<DiscrepancyItem>,
}

impl CrossValidationResult {
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &DiscrepancyItem> {
        self.discrepancies
            .iter()
            .filter(move |item| item.severity == severity)
    }

    pub fn has_critical(&self) -> bool {
        self.with_severity(Severity::Critical).next().is_some()
    }

    pub fn has_warnings(&self) -> bool {
        self.with_severity(Severity::Warning).next().is_some()
    }
}

/// Lowercase, no whitespace, variant branch unified.
pub fn normalize_can_chi(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<String>()
        .replace(&vocab::BRANCH_TY_VARIANT.to_lowercase(), "tỵ")
}

fn same_can_chi(a: &CanChi, b: &CanChi) -> bool {
    normalize_can_chi(&a.to_string()) == normalize_can_chi(&b.to_string())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn against_secondary(primary: &DayRecord, secondary: &SecondaryRecord, out: &mut Vec<DiscrepancyItem>) {
    if let Some(lunar) = &secondary.lunar_date {
        if lunar.day != primary.lunar_date.day {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::LunarDay,
                primary.lunar_date.day,
                lunar.day,
                "Lunar day mismatch between sources",
            ));
        }
        if lunar.month != primary.lunar_date.month {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::LunarMonth,
                primary.lunar_date.month,
                lunar.month,
                "Lunar month mismatch between sources",
            ));
        }
    }

    if let Some(can_chi) = &secondary.can_chi {
        if !same_can_chi(&primary.can_chi.day, &can_chi.day) {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::DayCanChi,
                primary.can_chi.day,
                can_chi.day,
                "Day Can Chi mismatch",
            ));
        }
        if let Some(year) = &can_chi.year
            && !same_can_chi(&primary.can_chi.year, year)
        {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::YearCanChi,
                primary.can_chi.year,
                year,
                "Year Can Chi mismatch",
            ));
        }
        if let Some(month) = &can_chi.month
            && !same_can_chi(&primary.can_chi.month, month)
        {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::MonthCanChi,
                primary.can_chi.month,
                month,
                "Month Can Chi mismatch (month boundary convention may differ)",
            ));
        }
    }

    if let (Some(ours), Some(theirs)) = (&primary.star28, &secondary.star28)
        && !same_name(&ours.name, &theirs.name)
    {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::Star28Name,
            &ours.name,
            &theirs.name,
            "Star 28 name mismatch",
        ));
    }
    if let (Some(ours), Some(theirs)) = (&primary.truc12, &secondary.truc12)
        && !same_name(&ours.name, &theirs.name)
    {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::Truc12Name,
            &ours.name,
            &theirs.name,
            "Truc 12 name mismatch",
        ));
    }

    for ours in &primary.directions {
        let Some(theirs) = secondary
            .directions
            .iter()
            .find(|theirs| same_name(&theirs.name, &ours.name))
        else {
            continue;
        };
        if !same_name(&ours.direction, &theirs.direction) {
            out.push(DiscrepancyItem::new(
                DiscrepancyField::Direction,
                format!("{}: {}", ours.name, ours.direction),
                format!("{}: {}", theirs.name, theirs.direction),
                "Direction mismatch",
            ));
        }
    }
}

fn against_reference(primary: &DayRecord, reference: &ReferenceRecord, out: &mut Vec<DiscrepancyItem>) {
    if reference.lunar_date.day != primary.lunar_date.day {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::LunarDay,
            primary.lunar_date.day,
            reference.lunar_date.day,
            "Lunar day differs from calculated",
        ));
    }
    if reference.lunar_date.month != primary.lunar_date.month {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::LunarMonth,
            primary.lunar_date.month,
            reference.lunar_date.month,
            "Lunar month differs from calculated",
        ));
    }
    if !same_can_chi(&primary.can_chi.day, &reference.day) {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::DayCanChi,
            primary.can_chi.day,
            reference.day,
            "Day Can Chi differs from calculated",
        ));
    }
    if !same_can_chi(&primary.can_chi.year, &reference.year) {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::YearCanChi,
            primary.can_chi.year,
            reference.year,
            "Year Can Chi differs from calculated",
        ));
    }
    if !same_can_chi(&primary.can_chi.month, &reference.month) {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::MonthCanChi,
            primary.can_chi.month,
            reference.month,
            "Month Can Chi differs from calculated (solar term vs lunar month boundary)",
        ));
    }
    if let (Some(ours), Some(theirs)) = (&primary.star28, &reference.star28)
        && !same_name(&ours.name, theirs)
    {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::Star28Name,
            &ours.name,
            theirs,
            "Star 28 name differs from calculated",
        ));
    }
    if let (Some(ours), Some(theirs)) = (&primary.truc12, &reference.truc12)
        && !same_name(&ours.name, theirs)
    {
        out.push(DiscrepancyItem::new(
            DiscrepancyField::Truc12Name,
            &ours.name,
            theirs,
            "Truc 12 name differs from calculated",
        ));
    }
}

/// Compare one primary record with whichever other sources are present.
pub fn validate(
    primary: &DayRecord,
    secondary: Option<&SecondaryRecord>,
    reference: Option<&ReferenceRecord>,
) -> CrossValidationResult {
    let mut discrepancies = Vec::new();
    let mut compared = Vec::new();

    if let Some(secondary) = secondary {
        against_secondary(primary, secondary, &mut discrepancies);
        compared.push(SourceKind::Secondary.label());
    }
    if let Some(reference) = reference {
        against_reference(primary, reference, &mut discrepancies);
        compared.push(SourceKind::Reference.label());
    }

    let is_consistent = !discrepancies
        .iter()
        .any(|item| item.severity == Severity::Critical);
    CrossValidationResult {
        solar_date: primary.solar_date,
        source1: SourceKind::Primary.label().to_string(),
        source2: compared.join(", "),
        is_consistent,
        discrepancies,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscrepancyBrief {
    pub field: DiscrepancyField,
    pub source1: String,
    pub source2: String,
    pub notes: Option<String>,
}

impl From<&DiscrepancyItem> for DiscrepancyBrief {
    fn from(item: &DiscrepancyItem) -> Self {
        Self {
            field: item.field,
            source1: item.source1_value.clone(),
            source2: item.source2_value.clone(),
            notes: item.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayDiscrepancies {
    pub date: NaiveDate,
    pub discrepancies: Vec<DiscrepancyBrief>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrossValidationSummary {
    pub total: usize,
    pub consistent: usize,
    pub inconsistent: usize,
    /// Days with at least one critical discrepancy.
    pub critical_count: usize,
    /// Days with warnings but nothing critical.
    pub warning_count: usize,
    pub critical_errors: Vec<DayDiscrepancies>,
    pub warnings: Vec<DayDiscrepancies>,
}

fn day_entry(result: &CrossValidationResult, severity: Severity) -> DayDiscrepancies {
    DayDiscrepancies {
        date: result.solar_date,
        discrepancies: result.with_severity(severity).map(DiscrepancyBrief::from).collect(),
    }
}

/// Every critical day is kept; warning-only days are sampled.
pub fn summarize(results: &[CrossValidationResult]) -> CrossValidationSummary {
    let mut summary = CrossValidationSummary {
        total: results.len(),
        ..CrossValidationSummary::default()
    };
    for result in results {
        if result.is_consistent {
            summary.consistent += 1;
        } else {
            summary.inconsistent += 1;
        }

        if result.has_critical() {
            summary.critical_count += 1;
            summary
                .critical_errors
                .push(day_entry(result, Severity::Critical));
        } else if result.has_warnings() {
            summary.warning_count += 1;
            if summary.warnings.len() < MAX_WARNING_DAYS {
                summary.warnings.push(day_entry(result, Severity::Warning));
            }
        }
    }
    summary
}

pub fn validate_all(
    primaries: &[DayRecord],
    secondary: &BTreeMap<NaiveDate, SecondaryRecord>,
    reference: &BTreeMap<NaiveDate, ReferenceRecord>,
) -> Vec<CrossValidationResult> {
    primaries
        .iter()
        .map(|primary| {
            validate(
                primary,
                secondary.get(&primary.solar_date),
                reference.get(&primary.solar_date),
            )
        })
        .collect()
}

pub fn validate_batch(
    primaries: &[DayRecord],
    secondary: &BTreeMap<NaiveDate, SecondaryRecord>,
    reference: &BTreeMap<NaiveDate, ReferenceRecord>,
) -> CrossValidationSummary {
    summarize(&validate_all(primaries, secondary, reference))
}
