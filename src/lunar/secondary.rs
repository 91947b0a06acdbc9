//! Parser for the secondary day page (xemngay.com layout).
//!
//! This source labels each fact inline ("Ngày: Kỷ Mùi", "Sao: [Tâm] (...)") and
//! is only used to cross-check and enrich the primary record.

use crate::error::ParseError;
use crate::lunar::model::{
    DirectionInfo, LunarDate, SecondaryCanChi, SecondaryRecord, SourceKind, Star28Detail,
    Truc12Info,
};
use crate::lunar::primary::capture_pair;
use crate::lunar::text::{
    Page, bounded_section, char_len, collapse_whitespace, compile, parse_number,
    strip_parentheticals,
};
use crate::lunar::vocab;
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, error};

const MAX_ACTIVITIES: usize = 20;
const ACTIVITY_MAX_CHARS: usize = 200;

struct DirectionPattern {
    re: Regex,
    name: &'static str,
    rating: u8,
}

/// One way a list section can open, and the labels that close it.
struct SectionPattern {
    open: Regex,
    ends: Vec<Regex>,
}

pub struct SecondaryParser {
    lunar_dates: Vec<Regex>,
    day_pair: Regex,
    month_pair: Regex,
    year_pair: Regex,
    star_full: Regex,
    star_element: Regex,
    star_name: Regex,
    truc12: Regex,
    directions: Vec<DirectionPattern>,
    good_sections: Vec<SectionPattern>,
    bad_sections: Vec<SectionPattern>,
}

impl SecondaryParser {
    pub fn new() -> Result<Self, ParseError> {
        let pair = format!(
            r"\[?\*{{0,2}}({})\*{{0,2}}\s*\*{{0,2}}({})\*{{0,2}}\]?",
            vocab::stem_alternation(),
            vocab::branch_alternation()
        );
        let truc_names = vocab::TRUC12
            .iter()
            .map(|(name, _)| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let directions = vocab::direction_alternation();
        let direction = |label: &str| -> Result<Regex, ParseError> {
            compile(&format!(r"(?i){label}[:\s]*\[?\s*({directions})"))
        };
        let good_ends = || -> Result<Vec<Regex>, ParseError> {
            Ok(vec![
                compile(r"[Kk]hông\s+nên")?,
                compile("[Kk]iêng")?,
                compile("[Tt]ránh")?,
            ])
        };
        let bad_ends = || -> Result<Vec<Regex>, ParseError> {
            Ok(vec![compile(r"[Nn]ên\s+làm")?, compile(r"[Cc]ó\s+thể")?])
        };

        Ok(Self {
            lunar_dates: vec![
                compile(r"[Nn]gày\s+[Ââ]m\s+lịch[:\s]*(\d{1,2})[/-](\d{1,2})[/-]?(\d{4})?")?,
                compile(r"(\d{1,2})[/-](\d{1,2})\s*[Ââ]m\s*lịch")?,
                compile(r"[Ââ]m\s+lịch[:\s]*(\d{1,2})[/-](\d{1,2})")?,
            ],
            day_pair: compile(&format!(r"[Nn]gày[:\s]*{pair}"))?,
            month_pair: compile(&format!(r"[Tt]háng[:\s]*{pair}"))?,
            year_pair: compile(&format!(r"[Nn]ăm[:\s]*{pair}"))?,
            star_full: compile(
                r"[Ss]ao[:\s]*\[?(\p{L}+)\]?\s*\([Tt]huộc\s*hành[:\s]*\*?\*?(\p{L}+)\*?\*?\s*,\s*[Cc]on\s*vật[:\s]*\*?\*?([\p{L}\s]+?)\*?\*?\)",
            )?,
            star_element: compile(r"[Ss]ao\s*\[?(\p{L}+)\]?\s*thuộc\s*hành\s*(\p{L}+)")?,
            star_name: compile(r"[Ss]ao[:\s]*\[?(\p{L}+)\]?")?,
            truc12: compile(&format!(r"[Tt]rực[:\s]*\[?({truc_names})\b"))?,
            directions: vec![
                DirectionPattern {
                    re: direction(r"(?:hướng\s+)?tài\s*lộc")?,
                    name: "Tài lộc",
                    rating: 5,
                },
                DirectionPattern {
                    re: direction(r"hỷ\s*thần")?,
                    name: "Hỷ thần",
                    rating: 5,
                },
                DirectionPattern {
                    re: direction(r"nhân\s*duyên")?,
                    name: "Nhân duyên",
                    rating: 4,
                },
                DirectionPattern {
                    re: direction(r"(?:hướng\s+)?bất\s*lợi")?,
                    name: "Bất lợi",
                    rating: 1,
                },
            ],
            good_sections: vec![
                SectionPattern {
                    open: compile(r"[Nn]ên\s+làm[:\s]*")?,
                    ends: good_ends()?,
                },
                SectionPattern {
                    open: compile(r"[Cc]ó\s+thể[:\s]*")?,
                    ends: good_ends()?,
                },
                SectionPattern {
                    open: compile(r"[Tt]hích\s+hợp[:\s]*")?,
                    ends: good_ends()?,
                },
            ],
            bad_sections: vec![
                SectionPattern {
                    open: compile(r"[Kk]hông\s+nên[:\s]*")?,
                    ends: bad_ends()?,
                },
                SectionPattern {
                    open: compile(r"[Kk]iêng[:\s]*")?,
                    ends: bad_ends()?,
                },
                SectionPattern {
                    open: compile(r"[Tt]ránh[:\s]*")?,
                    ends: bad_ends()?,
                },
            ],
        })
    }

    pub fn parse(&self, html: &str, solar_date: NaiveDate) -> Option<SecondaryRecord> {
        match self.try_parse(html, solar_date) {
            Ok(record) => Some(record),
            Err(err) => {
                error!("Error parsing secondary page for {}: {}", solar_date, err);
                None
            }
        }
    }

    pub fn try_parse(
        &self,
        html: &str,
        solar_date: NaiveDate,
    ) -> Result<SecondaryRecord, ParseError> {
        let page = Page::parse(html);
        if page.is_blank() {
            return Err(ParseError::EmptyDocument { date: solar_date });
        }
        let text = page.text();

        Ok(SecondaryRecord {
            solar_date,
            lunar_date: self.lunar_date(text, solar_date),
            can_chi: self.can_chi(text, solar_date),
            star28: self.star28(text),
            truc12: self.truc12(text),
            directions: self.directions(text),
            good_activities: self.activities(text, &self.good_sections),
            bad_activities: self.activities(text, &self.bad_sections),
            source: SourceKind::Secondary.label().to_string(),
        })
    }

    fn lunar_date(&self, text: &str, solar_date: NaiveDate) -> Option<LunarDate> {
        let found = self.lunar_dates.iter().find_map(|re| {
            let caps = re.captures(text)?;
            let day = parse_number::<u32>(caps.get(1)?.as_str())?;
            let month = parse_number::<u32>(caps.get(2)?.as_str())?;
            if !LunarDate::is_valid_day(day) || !LunarDate::is_valid_month(month) {
                return None;
            }
            let year = caps.get(3).and_then(|m| parse_number::<i32>(m.as_str()));
            Some((day as u8, month as u8, year))
        });
        let Some((day, month, year)) = found else {
            debug!("No lunar date on secondary page for {}", solar_date);
            return None;
        };
        Some(LunarDate {
            day,
            month,
            year: year.unwrap_or_else(|| LunarDate::year_for(solar_date, month)),
            is_leap_month: false,
        })
    }

    fn can_chi(&self, text: &str, solar_date: NaiveDate) -> Option<SecondaryCanChi> {
        let Some(day) = capture_pair(&self.day_pair, text) else {
            debug!("No day can-chi on secondary page for {}", solar_date);
            return None;
        };
        Some(SecondaryCanChi {
            day,
            month: capture_pair(&self.month_pair, text),
            year: capture_pair(&self.year_pair, text),
        })
    }

    /// Most detailed phrasing first; a candidate only counts if it names one of the 28.
    fn star28(&self, text: &str) -> Option<Star28Detail> {
        let detail = |name: &str, element: Option<&str>, animal: Option<&str>| {
            let (name, is_good) = vocab::star28(name)?;
            Some(Star28Detail {
                name: name.to_string(),
                element: element.map(|value| value.trim().to_string()),
                animal: animal
                    .map(collapse_whitespace)
                    .filter(|value| !value.is_empty()),
                is_good,
            })
        };

        self.star_full
            .captures_iter(text)
            .find_map(|caps| {
                detail(
                    caps.get(1)?.as_str(),
                    caps.get(2).map(|m| m.as_str()),
                    caps.get(3).map(|m| m.as_str()),
                )
            })
            .or_else(|| {
                self.star_element.captures_iter(text).find_map(|caps| {
                    detail(caps.get(1)?.as_str(), caps.get(2).map(|m| m.as_str()), None)
                })
            })
            .or_else(|| {
                self.star_name
                    .captures_iter(text)
                    .find_map(|caps| detail(caps.get(1)?.as_str(), None, None))
            })
    }

    fn truc12(&self, text: &str) -> Option<Truc12Info> {
        let caps = self.truc12.captures(text)?;
        let (name, is_good) = vocab::truc12(caps.get(1)?.as_str())?;
        Some(Truc12Info {
            name: name.to_string(),
            is_good,
            meaning: None,
        })
    }

    fn directions(&self, text: &str) -> Vec<DirectionInfo> {
        let mut found: Vec<DirectionInfo> = Vec::new();
        for pattern in &self.directions {
            if found.iter().any(|d| d.name == pattern.name) {
                continue;
            }
            let Some(raw) = pattern
                .re
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_lowercase())
            else {
                continue;
            };
            let Some(direction) = vocab::DIRECTIONS
                .iter()
                .find(|known| known.to_lowercase() == raw)
            else {
                continue;
            };
            found.push(DirectionInfo {
                name: pattern.name.to_string(),
                direction: direction.to_string(),
                rating: pattern.rating,
            });
        }
        found
    }

    /// First opening label present wins; the list is comma-separated short phrases.
    fn activities(&self, text: &str, sections: &[SectionPattern]) -> Vec<String> {
        let Some(section) = sections.iter().find_map(|pattern| {
            let ends = pattern.ends.iter().collect::<Vec<_>>();
            bounded_section(text, &pattern.open, &ends)
        }) else {
            return Vec::new();
        };

        collapse_whitespace(section)
            .split(',')
            .map(strip_parentheticals)
            .map(|item| item.trim_end_matches('.').trim().to_string())
            .filter(|item| {
                let len = char_len(item);
                len > 2 && len < ACTIVITY_MAX_CHARS
            })
            .take(MAX_ACTIVITIES)
            .collect()
    }
}

/// Parse a secondary page with a freshly built parser.
pub fn parse(html: &str, solar_date: NaiveDate) -> Option<SecondaryRecord> {
    match SecondaryParser::new() {
        Ok(parser) => parser.parse(html, solar_date),
        Err(err) => {
            error!("Secondary parser unavailable: {}", err);
            None
        }
    }
}

pub fn try_parse(html: &str, solar_date: NaiveDate) -> Result<SecondaryRecord, ParseError> {
    SecondaryParser::new()?.try_parse(html, solar_date)
}
