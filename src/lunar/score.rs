use crate::lunar::model::DayRecord;
use serde::{Deserialize, Serialize};

const BASE: i32 = 50;

/// 0..=100 score of a day from the primary page's own verdicts.
pub fn day_score(record: &DayRecord) -> u8 {
    let mut score = BASE;

    // A missing star or truc counts as inauspicious, as in the app's own scoring.
    let star_good = record.star28.as_ref().is_some_and(|star| star.is_good);
    let truc_good = record.truc12.as_ref().is_some_and(|truc| truc.is_good);
    score += if star_good { 20 } else { -15 };
    score += if truc_good { 15 } else { -10 };

    score += 2 * record.good_stars.len() as i32;
    score -= 2 * record.bad_stars.len() as i32;
    score += record.good_activities.len() as i32;
    score -= record.bad_activities.len() as i32;
    score += record
        .hoang_dao_hours
        .iter()
        .filter(|hour| hour.is_hoang_dao)
        .count() as i32;

    score.clamp(0, 100) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayQuality {
    Excellent,
    Good,
    Normal,
    Bad,
    VeryBad,
}

impl DayQuality {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => DayQuality::Excellent,
            65..=79 => DayQuality::Good,
            50..=64 => DayQuality::Normal,
            35..=49 => DayQuality::Bad,
            _ => DayQuality::VeryBad,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayQuality::Excellent => "excellent",
            DayQuality::Good => "good",
            DayQuality::Normal => "normal",
            DayQuality::Bad => "bad",
            DayQuality::VeryBad => "very_bad",
        }
    }
}
