//! One canonical record per day, resolved field by field through [`TRUST_TABLE`].

use crate::lunar::model::{
    CanChiInfo, DayRecord, ReferenceRecord, SecondaryRecord, SourceKind, Star28Info, Truc12Info,
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    LunarDate,
    CanChi,
    NguHanh,
    TietKhi,
    Truc12Name,
    Truc12Polarity,
    Star28Name,
    Star28Meaning,
    Star28Polarity,
    /// Activities, directions, star lists, hour flags, travel hours, ages and score.
    PrimaryOnly,
}

use SourceKind::{Primary, Reference, Secondary};

/// Sources consulted per field, most trusted first. The first source holding a value wins.
pub const TRUST_TABLE: [(MergeField, &[SourceKind]); 10] = [
    (MergeField::LunarDate, &[Reference, Primary]),
    (MergeField::CanChi, &[Reference, Primary]),
    (MergeField::NguHanh, &[Primary]),
    (MergeField::TietKhi, &[Reference, Primary]),
    (MergeField::Truc12Name, &[Reference, Primary]),
    (MergeField::Truc12Polarity, &[Primary]),
    (MergeField::Star28Name, &[Reference, Primary]),
    (MergeField::Star28Meaning, &[Secondary, Primary]),
    (MergeField::Star28Polarity, &[Primary]),
    (MergeField::PrimaryOnly, &[Primary]),
];

pub fn precedence(field: MergeField) -> &'static [SourceKind] {
    TRUST_TABLE
        .iter()
        .find(|(known, _)| *known == field)
        .map(|(_, order)| *order)
        .unwrap_or(&[Primary])
}

/// What each source has to say about one field.
struct Candidates<T> {
    primary: Option<T>,
    secondary: Option<T>,
    reference: Option<T>,
}

impl<T> Candidates<T> {
    fn new(primary: Option<T>) -> Self {
        Self {
            primary,
            secondary: None,
            reference: None,
        }
    }

    fn secondary(mut self, value: Option<T>) -> Self {
        self.secondary = value;
        self
    }

    fn reference(mut self, value: Option<T>) -> Self {
        self.reference = value;
        self
    }

    fn resolve(self, field: MergeField) -> Option<T> {
        let Candidates {
            mut primary,
            mut secondary,
            mut reference,
        } = self;
        precedence(field).iter().find_map(|source| match source {
            Primary => primary.take(),
            Secondary => secondary.take(),
            Reference => reference.take(),
        })
    }
}

/// "Hành: X, Con vật: Y" from whatever constellation detail the secondary page printed.
fn star_detail_text(secondary: &SecondaryRecord) -> Option<String> {
    let detail = secondary.star28.as_ref()?;
    let mut parts = Vec::new();
    if let Some(element) = &detail.element {
        parts.push(format!("Hành: {element}"));
    }
    if let Some(animal) = &detail.animal {
        parts.push(format!("Con vật: {animal}"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn merge(
    primary: &DayRecord,
    secondary: Option<&SecondaryRecord>,
    reference: Option<&ReferenceRecord>,
) -> DayRecord {
    let mut merged = primary.clone();

    merged.lunar_date = Candidates::new(Some(primary.lunar_date))
        .reference(reference.map(|r| r.lunar_date))
        .resolve(MergeField::LunarDate)
        .unwrap_or(primary.lunar_date);

    let pairs = Candidates::new(Some((
        primary.can_chi.year,
        primary.can_chi.month,
        primary.can_chi.day,
    )))
    .reference(reference.map(|r| (r.year, r.month, r.day)))
    .resolve(MergeField::CanChi);
    if let Some((year, month, day)) = pairs {
        merged.can_chi = CanChiInfo {
            year,
            month,
            day,
            ngu_hanh: Candidates::new(Some(primary.can_chi.ngu_hanh))
                .resolve(MergeField::NguHanh)
                .unwrap_or(primary.can_chi.ngu_hanh),
        };
    }

    merged.tiet_khi = Candidates::new(primary.tiet_khi.clone())
        .reference(reference.and_then(|r| r.tiet_khi.clone()))
        .resolve(MergeField::TietKhi);

    merged.truc12 = primary.truc12.as_ref().map(|truc| Truc12Info {
        name: Candidates::new(Some(truc.name.clone()))
            .reference(reference.and_then(|r| r.truc12.clone()))
            .resolve(MergeField::Truc12Name)
            .unwrap_or_else(|| truc.name.clone()),
        is_good: truc.is_good,
        meaning: truc.meaning.clone(),
    });

    merged.star28 = primary.star28.as_ref().map(|star| Star28Info {
        name: Candidates::new(Some(star.name.clone()))
            .reference(reference.and_then(|r| r.star28.clone()))
            .resolve(MergeField::Star28Name)
            .unwrap_or_else(|| star.name.clone()),
        is_good: star.is_good,
        meaning: Candidates::new(star.meaning.clone())
            .secondary(secondary.and_then(star_detail_text))
            .resolve(MergeField::Star28Meaning),
    });

    let mut sources = vec![Primary.label()];
    if secondary.is_some() {
        sources.push(Secondary.label());
    }
    if reference.is_some() {
        sources.push(Reference.label());
    }
    merged.source = sources.join(",");
    merged.scraped_at = Some(Utc::now());
    merged
}

/// Merge each primary record with the same-day secondary and reference records, if any.
pub fn merge_batch(
    primaries: &[DayRecord],
    secondary: &BTreeMap<NaiveDate, SecondaryRecord>,
    reference: &BTreeMap<NaiveDate, ReferenceRecord>,
) -> Vec<DayRecord> {
    primaries
        .iter()
        .map(|primary| {
            merge(
                primary,
                secondary.get(&primary.solar_date),
                reference.get(&primary.solar_date),
            )
        })
        .collect()
}
