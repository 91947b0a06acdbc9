//! Parser for the primary day page (lichngaytot.com layout).
//!
//! Every field has an ordered chain of heuristics. A miss falls through to the
//! next heuristic and finally to a default; only a page with no text at all is
//! rejected as a whole.

use crate::error::ParseError;
use crate::lunar::model::{
    ActivityInfo, CanChi, CanChiInfo, ConflictingAges, DayRecord, DirectionInfo, LunarDate,
    SourceKind, Star28Info, TravelHour, Truc12Info, day_hours,
};
use crate::lunar::score;
use crate::lunar::text::{
    Page, bounded_section, char_len, collapse_whitespace, compile, first_of, parse_number,
    strip_parentheticals, truncate_chars,
};
use crate::lunar::vocab::{self, Branch, Stem};
use chrono::NaiveDate;
use regex::Regex;
use tracing::{debug, error};

const ACTIVITY_MAX_CHARS: usize = 500;
const TRAVEL_DESCRIPTION_MAX_CHARS: usize = 300;
const STARS_FALLBACK_WINDOW: usize = 5000;

/// Year/month/day can-chi phrases, e.g. "Năm Ất Tỵ".
struct PairPatterns {
    year: Regex,
    month: Regex,
    day: Regex,
}

impl PairPatterns {
    fn new(separator: &str) -> Result<Self, ParseError> {
        let pair = format!(
            r"({})\s*({})",
            vocab::stem_alternation(),
            vocab::branch_alternation()
        );
        Ok(Self {
            year: compile(&format!("[Nn]ăm{separator}{pair}"))?,
            month: compile(&format!("[Tt]háng{separator}{pair}"))?,
            day: compile(&format!("[Nn]gày{separator}{pair}"))?,
        })
    }
}

pub(crate) fn capture_pair(re: &Regex, text: &str) -> Option<CanChi> {
    let caps = re.captures(text)?;
    let can = Stem::from_name(caps.get(1)?.as_str())?;
    let chi = Branch::from_name(caps.get(2)?.as_str())?;
    Some(CanChi::new(can, chi))
}

struct DirectionPattern {
    re: Regex,
    name: &'static str,
    rating: u8,
}

pub struct PrimaryParser {
    title_date: Regex,
    body_dates: Vec<Regex>,
    leap: Regex,
    box_pairs: PairPatterns,
    body_pairs: PairPatterns,
    tiet_khi_labeled: Regex,
    star28: Regex,
    truc12: Regex,
    hoang_dao_entry: Regex,
    hoang_dao_open: Regex,
    hac_dao: Regex,
    hoang_dao_line: Regex,
    directions: Vec<DirectionPattern>,
    good_open: Regex,
    good_ends: Vec<Regex>,
    bad_open: Regex,
    bad_ends: Vec<Regex>,
    stars_open: Regex,
    stars_ends: Vec<Regex>,
    good_stars: Regex,
    bad_stars: Regex,
    star_name: Regex,
    good_star_noise: Regex,
    bad_star_noise: Regex,
    travel_open: Regex,
    travel_ends: Vec<Regex>,
    travel_entry: Regex,
    hour_range: Regex,
    xung_ngay: Regex,
    xung_thang: Regex,
}

impl PrimaryParser {
    pub fn new() -> Result<Self, ParseError> {
        let star_names = vocab::STAR28
            .iter()
            .map(|(name, _)| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let truc_names = vocab::TRUC12
            .iter()
            .map(|(name, _)| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let terms = vocab::solar_term_names()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let travel_names = vocab::TRAVEL_HOURS
            .iter()
            .map(|(name, _)| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let directions = vocab::direction_alternation();

        Ok(Self {
            title_date: compile(r"[Ll]ịch\s+[Ââ]m\s+(\d{1,2})[-/](\d{1,2})[-/](\d{4})")?,
            body_dates: vec![
                compile(r"[Ll]ịch\s+[Ââ]m\s+(\d{1,2})[-/](\d{1,2})")?,
                compile(r"(\d{1,2})[-/](\d{1,2})\s*[Ââ]m")?,
                compile(r"[Nn]gày\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+[Ââ]m")?,
            ],
            leap: compile(r"(?i)nhuận")?,
            box_pairs: PairPatterns::new(r"\s*")?,
            body_pairs: PairPatterns::new(r"[:\s]*")?,
            tiet_khi_labeled: compile(&format!(r"(?i)tiết\s+khí[:\s]*({terms})"))?,
            star28: compile(&format!(r"[Ss]ao\s+({star_names})\b"))?,
            truc12: compile(&format!(r"[Tt]rực[:\s]*({truc_names})\b"))?,
            hoang_dao_entry: compile(&format!(
                r"\b\w+\s+({})\s*\(",
                vocab::branch_alternation()
            ))?,
            hoang_dao_open: compile(r"[Gg]iờ\s+[Hh]oàng\s+[Đđ]ạo[:\s]*")?,
            hac_dao: compile(r"[Gg]iờ\s+[Hh]ắc")?,
            hoang_dao_line: compile(r"[Hh]oàng\s+[Đđ]ạo[:\s]*([^\n]+)")?,
            directions: vec![
                DirectionPattern {
                    re: compile(&format!(
                        r"[Hh]ỷ\s*thần[^:]*:\s*[Hh]ướng\s+({directions})"
                    ))?,
                    name: "Hỷ thần",
                    rating: 5,
                },
                DirectionPattern {
                    re: compile(&format!(
                        r"[Tt]ài\s*thần[^:]*:\s*[Hh]ướng\s+({directions})"
                    ))?,
                    name: "Tài thần",
                    rating: 5,
                },
                DirectionPattern {
                    re: compile(&format!(
                        r"[Hh]ắc\s*thần[^:]*:\s*[Hh]ướng\s+({directions})"
                    ))?,
                    name: "Hắc thần",
                    rating: 1,
                },
            ],
            good_open: compile(r"-?\s*Nên làm[:\s]+")?,
            good_ends: vec![
                compile(r"Kỵ\s*làm")?,
                compile(r"Kiêng\s*cữ")?,
                compile(r"Ngoại\s*lệ")?,
            ],
            bad_open: compile(r"-?\s*(?:Kỵ\s*làm|Kiêng\s*cữ)[:\s]+")?,
            bad_ends: vec![
                compile(r"Ngoại\s*lệ")?,
                compile(r"Sao\s+\w+\s+trúng")?,
                compile(r"Nhân thần")?,
            ],
            stars_open: compile(r"(?s)[Cc]át\s*tinh.*?[Hh]ung\s*tinh")?,
            stars_ends: vec![compile(r"Hôm nay ngày gì")?, compile(r"Hướng xuất hành")?],
            good_stars: compile(r"sao tốt là\s*([^C]+?)(?:Các sao xấu|$)")?,
            bad_stars: compile(r"(?s)sao xấu là\s*(.+?)(?:Hôm nay ngày gì|$)")?,
            star_name: compile(r"([^;:]+):")?,
            good_star_noise: compile(r"Xem|ngày|năm|tháng")?,
            bad_star_noise: compile(r"(?i)Xem|ngày|năm|tháng|cầu")?,
            travel_open: compile(r"Giờ xuất hành theo Lý Thuần Phong")?,
            travel_ends: vec![compile(r"Tuổi xung khắc")?, compile(r"Hướng xuất hành")?],
            travel_entry: compile(&format!(
                r"((?:\d{{1,2}}h\s*-\s*\d{{1,2}}h\s*)+)\s*({travel_names})[:\s]*(?:TỐT|XẤU)?"
            ))?,
            hour_range: compile(r"\d{1,2}h\s*-\s*\d{1,2}h")?,
            xung_ngay: compile(r"(?m)Xung ngày[:\s]*([^\n]+?)(?:Xung tháng|Sao tốt|$)")?,
            xung_thang: compile(r"(?m)Xung tháng[:\s]*([^\n]+?)(?:Sao tốt|Ngày kỵ|$)")?,
        })
    }

    /// Parse one page, logging and swallowing structural failures.
    pub fn parse(&self, html: &str, solar_date: NaiveDate) -> Option<DayRecord> {
        match self.try_parse(html, solar_date) {
            Ok(record) => Some(record),
            Err(err) => {
                error!("Error parsing primary page for {}: {}", solar_date, err);
                None
            }
        }
    }

    pub fn try_parse(&self, html: &str, solar_date: NaiveDate) -> Result<DayRecord, ParseError> {
        let page = Page::parse(html);
        if page.is_blank() {
            return Err(ParseError::EmptyDocument { date: solar_date });
        }

        let lunar_date = self.lunar_date(&page, solar_date);
        let can_chi = self.can_chi(&page, solar_date);
        let (good_stars, bad_stars) = self.stars(&page);

        let mut record = DayRecord {
            solar_date,
            lunar_date,
            can_chi,
            tiet_khi: self.tiet_khi(&page),
            star28: self.star28(&page),
            truc12: self.truc12(&page),
            hoang_dao_hours: day_hours(&self.hoang_dao(&page)),
            directions: self.directions(&page),
            good_activities: self.activities(&page, &self.good_open, &self.good_ends),
            bad_activities: self.activities(&page, &self.bad_open, &self.bad_ends),
            good_stars,
            bad_stars,
            travel_hours: self.travel_hours(&page),
            conflicting_ages: self.conflicting_ages(&page),
            day_score: None,
            source: SourceKind::Primary.label().to_string(),
            scraped_at: None,
        };
        record.day_score = Some(score::day_score(&record));
        Ok(record)
    }

    fn title_date(&self, page: &Page) -> Option<(u8, u8)> {
        let title = page.title()?;
        let caps = self.title_date.captures(&title)?;
        day_month(caps.get(1)?.as_str(), caps.get(2)?.as_str())
    }

    fn span_day(&self, page: &Page) -> Option<u8> {
        let spans = page.select_texts("span.ngay-am").ok()?;
        spans.iter().find_map(|raw| {
            let day = parse_number::<u32>(raw)?;
            LunarDate::is_valid_day(day).then_some(day as u8)
        })
    }

    fn worded_month(&self, page: &Page) -> Option<u8> {
        let blocks = page.select_texts("div.calendar-info2").ok()?;
        blocks.iter().find_map(|block| {
            let lower = block.to_lowercase();
            vocab::LUNAR_MONTH_NAMES
                .iter()
                .find(|(name, _)| lower.contains(&format!("tháng {name}")))
                .map(|(_, month)| *month)
        })
    }

    fn body_date(&self, page: &Page) -> Option<(u8, u8)> {
        self.body_dates.iter().find_map(|re| {
            let caps = re.captures(page.text())?;
            day_month(caps.get(1)?.as_str(), caps.get(2)?.as_str())
        })
    }

    fn lunar_date(&self, page: &Page, solar_date: NaiveDate) -> LunarDate {
        let day = first_of(
            page,
            &[
                &|p: &Page| self.title_date(p).map(|(day, _)| day),
                &|p: &Page| self.span_day(p),
                &|p: &Page| self.body_date(p).map(|(day, _)| day),
            ],
        );
        let month = first_of(
            page,
            &[
                &|p: &Page| self.title_date(p).map(|(_, month)| month),
                &|p: &Page| self.worded_month(p),
                &|p: &Page| self.body_date(p).map(|(_, month)| month),
            ],
        );
        if day.is_none() || month.is_none() {
            debug!("Lunar date incomplete on primary page for {}", solar_date);
        }
        let day = day.unwrap_or(1);
        let month = month.unwrap_or(1);

        LunarDate {
            day,
            month,
            year: LunarDate::year_for(solar_date, month),
            is_leap_month: self.leap.is_match(page.text()),
        }
    }

    fn info_box_text(&self, page: &Page) -> Option<String> {
        let boxes = page.select_texts("div.calendar-box2").ok()?;
        (!boxes.is_empty()).then(|| boxes.join("\n"))
    }

    fn can_chi(&self, page: &Page, solar_date: NaiveDate) -> CanChiInfo {
        let info_box = self.info_box_text(page);
        let pick = |boxed: &Regex, body: &Regex, label: &str, fallback: CanChi| -> CanChi {
            let found = info_box
                .as_deref()
                .and_then(|text| capture_pair(boxed, text))
                .or_else(|| capture_pair(body, page.text()));
            found.unwrap_or_else(|| {
                debug!("No {} can-chi on primary page for {}", label, solar_date);
                fallback
            })
        };
        let year = pick(
            &self.box_pairs.year,
            &self.body_pairs.year,
            "year",
            CanChi::new(Stem::Giap, Branch::Thin),
        );
        let month = pick(
            &self.box_pairs.month,
            &self.body_pairs.month,
            "month",
            CanChi::new(Stem::Giap, Branch::Ty),
        );
        let day = pick(
            &self.box_pairs.day,
            &self.body_pairs.day,
            "day",
            CanChi::new(Stem::Giap, Branch::Ty),
        );
        CanChiInfo::from_pairs(year, month, day)
    }

    fn tiet_khi(&self, page: &Page) -> Option<String> {
        let info_box = self.info_box_text(page);
        let mentioned = |text: &str| -> Option<String> {
            let lower = text.to_lowercase();
            vocab::solar_term_names()
                .find(|term| lower.contains(&term.to_lowercase()))
                .map(str::to_string)
        };
        first_of(
            page,
            &[
                &|p: &Page| {
                    let caps = self.tiet_khi_labeled.captures(p.text())?;
                    let raw = caps.get(1)?.as_str().to_lowercase();
                    vocab::solar_term_names()
                        .find(|term| term.to_lowercase() == raw)
                        .map(str::to_string)
                },
                &|_: &Page| info_box.as_deref().and_then(mentioned),
                &|p: &Page| mentioned(p.text()),
            ],
        )
    }

    fn star28(&self, page: &Page) -> Option<Star28Info> {
        let caps = self.star28.captures(page.text())?;
        let (name, is_good) = vocab::star28(caps.get(1)?.as_str())?;
        Some(Star28Info {
            name: name.to_string(),
            is_good,
            meaning: None,
        })
    }

    fn truc12(&self, page: &Page) -> Option<Truc12Info> {
        let caps = self.truc12.captures(page.text())?;
        let (name, is_good) = vocab::truc12(caps.get(1)?.as_str())?;
        Some(Truc12Info {
            name: name.to_string(),
            is_good,
            meaning: None,
        })
    }

    /// Branches named in the list of auspicious hours, e.g. "Giáp Tý (23h-1h)".
    fn hoang_dao_from_columns(&self, page: &Page) -> Option<Vec<Branch>> {
        let columns = page.select_texts("div.calendar-col2").ok()?;
        let mut found = Vec::new();
        for column in columns
            .iter()
            .filter(|column| column.to_lowercase().contains("hoàng đạo"))
        {
            for caps in self.hoang_dao_entry.captures_iter(column) {
                if let Some(chi) = caps.get(1).and_then(|m| Branch::from_name(m.as_str()))
                    && !found.contains(&chi)
                {
                    found.push(chi);
                }
            }
        }
        non_empty(found)
    }

    fn hoang_dao_from_section(&self, page: &Page) -> Option<Vec<Branch>> {
        let section = bounded_section(page.text(), &self.hoang_dao_open, &[&self.hac_dao])?;
        non_empty(branches_mentioned(section))
    }

    fn hoang_dao_from_line(&self, page: &Page) -> Option<Vec<Branch>> {
        let caps = self.hoang_dao_line.captures(page.text())?;
        non_empty(branches_mentioned(caps.get(1)?.as_str()))
    }

    fn hoang_dao(&self, page: &Page) -> Vec<Branch> {
        first_of(
            page,
            &[
                &|p: &Page| self.hoang_dao_from_columns(p),
                &|p: &Page| self.hoang_dao_from_section(p),
                &|p: &Page| self.hoang_dao_from_line(p),
            ],
        )
        .unwrap_or_default()
    }

    fn directions(&self, page: &Page) -> Vec<DirectionInfo> {
        self.directions
            .iter()
            .filter_map(|pattern| {
                let caps = pattern.re.captures(page.text())?;
                let direction = caps.get(1)?.as_str().trim();
                (!direction.is_empty()).then(|| DirectionInfo {
                    name: pattern.name.to_string(),
                    direction: direction.to_string(),
                    rating: pattern.rating,
                })
            })
            .collect()
    }

    fn activities(&self, page: &Page, open: &Regex, ends: &[Regex]) -> Vec<ActivityInfo> {
        let ends = ends.iter().collect::<Vec<_>>();
        let Some(section) = bounded_section(page.text(), open, &ends) else {
            return Vec::new();
        };
        let cleaned = collapse_whitespace(section.trim_end_matches(|c: char| c == '-' || c.is_whitespace()));
        if char_len(&cleaned) <= 5 {
            return Vec::new();
        }
        vec![ActivityInfo {
            name: truncate_chars(&cleaned, ACTIVITY_MAX_CHARS),
            category: "description".to_string(),
        }]
    }

    fn stars_section<'t>(&self, text: &'t str) -> &'t str {
        let Some(opening) = self.stars_open.find(text) else {
            let cut = text
                .char_indices()
                .nth(STARS_FALLBACK_WINDOW)
                .map(|(idx, _)| idx)
                .unwrap_or(text.len());
            return &text[..cut];
        };
        let rest = &text[opening.end()..];
        let stop = self
            .stars_ends
            .iter()
            .filter_map(|end| end.find(rest).map(|m| m.start()))
            .min()
            .unwrap_or(rest.len());
        &text[opening.start()..opening.end() + stop]
    }

    fn stars(&self, page: &Page) -> (Vec<String>, Vec<String>) {
        let section = self.stars_section(page.text());

        let good = self
            .good_stars
            .captures(section)
            .and_then(|caps| caps.get(1))
            .map(|list| {
                self.star_names(list.as_str())
                    .filter(|name| {
                        (2..=30).contains(&char_len(name)) && !self.good_star_noise.is_match(name)
                    })
                    .collect()
            })
            .unwrap_or_default();

        let bad = self
            .bad_stars
            .captures(section)
            .and_then(|caps| caps.get(1))
            .map(|list| {
                self.star_names(list.as_str())
                    .map(|name| strip_parentheticals(&name))
                    .filter(|name| {
                        (2..=20).contains(&char_len(name)) && !self.bad_star_noise.is_match(name)
                    })
                    .collect()
            })
            .unwrap_or_default();

        (good, bad)
    }

    /// Names written as "Name: meaning;".
    fn star_names<'a>(&'a self, list: &'a str) -> impl Iterator<Item = String> + 'a {
        self.star_name
            .captures_iter(list)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn travel_hours(&self, page: &Page) -> Vec<TravelHour> {
        let ends = self.travel_ends.iter().collect::<Vec<_>>();
        let Some(section) = bounded_section(page.text(), &self.travel_open, &ends) else {
            return Vec::new();
        };

        let entries = self.travel_entry.captures_iter(section).collect::<Vec<_>>();
        let mut hours: Vec<TravelHour> = Vec::new();
        for (idx, caps) in entries.iter().enumerate() {
            let (Some(whole), Some(ranges), Some(name)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            let Some((name, is_good)) = vocab::TRAVEL_HOURS
                .iter()
                .find(|(known, _)| *known == name.as_str())
                .copied()
            else {
                continue;
            };
            if hours.iter().any(|hour| hour.name == name) {
                continue;
            }
            let description_end = entries
                .get(idx + 1)
                .and_then(|next| next.get(0))
                .map(|next| next.start())
                .unwrap_or(section.len());
            let description = describe(&section[whole.end()..description_end]);
            let time_range = self
                .hour_range
                .find_iter(ranges.as_str())
                .map(|m| m.as_str().split_whitespace().collect::<String>())
                .collect::<Vec<_>>()
                .join(", ");
            hours.push(TravelHour {
                time_range,
                name: name.to_string(),
                is_good,
                description,
            });
        }
        hours
    }

    fn conflicting_ages(&self, page: &Page) -> Option<ConflictingAges> {
        let ages = |re: &Regex| -> Vec<String> {
            re.captures(page.text())
                .and_then(|caps| caps.get(1))
                .map(|list| {
                    list.as_str()
                        .split(',')
                        .map(str::trim)
                        .filter(|item| !item.is_empty() && char_len(item) <= 20)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default()
        };
        let xung_ngay = ages(&self.xung_ngay);
        let xung_thang = ages(&self.xung_thang);
        if xung_ngay.is_empty() && xung_thang.is_empty() {
            return None;
        }
        Some(ConflictingAges {
            xung_ngay,
            xung_thang,
        })
    }
}

/// Parse a primary page with a freshly built parser.
pub fn parse(html: &str, solar_date: NaiveDate) -> Option<DayRecord> {
    match PrimaryParser::new() {
        Ok(parser) => parser.parse(html, solar_date),
        Err(err) => {
            error!("Primary parser unavailable: {}", err);
            None
        }
    }
}

pub fn try_parse(html: &str, solar_date: NaiveDate) -> Result<DayRecord, ParseError> {
    PrimaryParser::new()?.try_parse(html, solar_date)
}

fn day_month(day: &str, month: &str) -> Option<(u8, u8)> {
    let day = parse_number::<u32>(day)?;
    let month = parse_number::<u32>(month)?;
    (LunarDate::is_valid_day(day) && LunarDate::is_valid_month(month))
        .then_some((day as u8, month as u8))
}

fn branches_mentioned(text: &str) -> Vec<Branch> {
    Branch::ALL
        .into_iter()
        .filter(|chi| {
            text.contains(chi.name()) || (*chi == Branch::Ti && text.contains(vocab::BRANCH_TY_VARIANT))
        })
        .collect()
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// At most two sentences and a fixed number of characters.
fn describe(raw: &str) -> Option<String> {
    let text = collapse_whitespace(raw);
    let mut cut = text.len();
    let mut periods = 0;
    for (idx, ch) in text.char_indices() {
        if ch == '.' {
            periods += 1;
            if periods == 2 {
                cut = idx + ch.len_utf8();
                break;
            }
        }
    }
    let trimmed = truncate_chars(&text[..cut], TRAVEL_DESCRIPTION_MAX_CHARS)
        .trim()
        .to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::lunar::vocab::Element;

    pub(crate) const PRIMARY_PAGE: &str = r#"<html><head>
<title>Lịch âm 2-12-2024 - Xem ngày tốt xấu 01/01/2025</title>
<script>var label = "Sao Giác";</script>
</head><body>
<div class="calendar-box2">
  <span class="ngay-am">2</span>
  <div class="calendar-info2">THÁNG CHẠP (ĐỦ)</div>
  <p>Năm Giáp Thìn</p><p>Tháng Bính Tý</p><p>Ngày Kỷ Mùi</p>
  <p>Tiết khí: Đông chí</p>
</div>
<div class="calendar-col2"><b>Giờ Hoàng Đạo</b>
  <p>Giáp Dần (3h-5h), Đinh Mão (5h-7h), Kỷ Tỵ (9h-11h), Nhâm Thân (15h-17h), Giáp Tuất (19h-21h), Ất Hợi (21h-23h)</p>
</div>
<div class="content">
  <p>Trực: Bình</p>
  <p>Nhị thập bát tú: Sao Tâm</p>
  <p>- Nên làm: Khởi công tạo tác, cưới hỏi, xây nhà, khai trương đều tốt.</p>
  <p>- Kỵ làm: An táng, chôn cất, đào giếng.</p>
  <p>- Ngoại lệ: Sao Tâm gặp ngày Hợi thì tốt.</p>
  <h3>Cát tinh và Hung tinh</h3>
  <p>Các sao tốt là Nguyệt Đức: Tốt mọi việc; Thiên Hỷ: Tốt mọi việc, nhất là cưới hỏi; Các sao xấu là Thiên Cương (Diệt Môn): Xấu mọi việc; Tiểu Hao: Xấu về giao dịch;</p>
  <h3>Hướng xuất hành</h3>
  <p>Hỷ thần (hướng thần may mắn) - TỐT: Hướng Đông Bắc</p>
  <p>Tài thần (hướng thần tài) - TỐT: Hướng Nam</p>
  <p>Hắc thần (hướng ông thần ác) - XẤU, nên tránh: Hướng Tây Bắc</p>
  <h3>Giờ xuất hành theo Lý Thuần Phong</h3>
  <p>11h-13h 23h-1h Tốc hỷ: TỐT Tin vui sắp tới. Cầu tài đi hướng Nam. Đi việc gặp gỡ thuận lợi.</p>
  <p>1h-3h 13h-15h Lưu niên: XẤU Nghiệp khó thành, cầu tài mờ mịt.</p>
  <h3>Tuổi xung khắc</h3>
  <p>Xung ngày: Quý Sửu, Đinh Sửu, Ất Dậu, Ất Mão</p>
  <p>Xung tháng: Mậu Ngọ, Nhâm Ngọ, Canh Dần, Canh Thân</p>
</div>
</body></html>"#;

    fn jan_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date")
    }

    fn parser() -> PrimaryParser {
        PrimaryParser::new().expect("patterns compile")
    }

    #[test]
    fn parses_full_primary_page() {
        let record = parser()
            .try_parse(PRIMARY_PAGE, jan_first())
            .expect("page parses");

        assert_eq!(record.lunar_date.day, 2);
        assert_eq!(record.lunar_date.month, 12);
        assert_eq!(record.lunar_date.year, 2024);
        assert!(!record.lunar_date.is_leap_month);
        assert_eq!(record.can_chi.year.to_string(), "Giáp Thìn");
        assert_eq!(record.can_chi.month.to_string(), "Bính Tý");
        assert_eq!(record.can_chi.day.to_string(), "Kỷ Mùi");
        assert_eq!(record.can_chi.ngu_hanh, Element::Tho);
        assert_eq!(record.tiet_khi.as_deref(), Some("Đông chí"));
        assert_eq!(record.source, "lichngaytot.com");

        let star = record.star28.as_ref().expect("star28");
        assert_eq!(star.name, "Tâm");
        assert!(!star.is_good);
        let truc = record.truc12.as_ref().expect("truc12");
        assert_eq!(truc.name, "Bình");
        assert!(truc.is_good);
    }

    #[test]
    fn hoang_dao_hours_come_from_hour_column() {
        let record = parser()
            .try_parse(PRIMARY_PAGE, jan_first())
            .expect("page parses");
        assert_eq!(
            record.hoang_dao_branches(),
            vec![
                Branch::Dan,
                Branch::Mao,
                Branch::Ti,
                Branch::Than,
                Branch::Tuat,
                Branch::Hoi
            ]
        );
        assert_eq!(record.hoang_dao_hours.len(), 12);
        for hour in &record.hoang_dao_hours {
            assert_ne!(hour.is_hoang_dao, hour.is_hac_dao);
        }
    }

    #[test]
    fn directions_stars_and_activities_are_extracted() {
        let record = parser()
            .try_parse(PRIMARY_PAGE, jan_first())
            .expect("page parses");

        let directions = record
            .directions
            .iter()
            .map(|d| (d.name.as_str(), d.direction.as_str(), d.rating))
            .collect::<Vec<_>>();
        assert_eq!(
            directions,
            vec![
                ("Hỷ thần", "Đông Bắc", 5),
                ("Tài thần", "Nam", 5),
                ("Hắc thần", "Tây Bắc", 1)
            ]
        );

        assert_eq!(record.good_stars, vec!["Nguyệt Đức", "Thiên Hỷ"]);
        assert_eq!(record.bad_stars, vec!["Thiên Cương", "Tiểu Hao"]);

        assert_eq!(record.good_activities.len(), 1);
        assert_eq!(
            record.good_activities[0].name,
            "Khởi công tạo tác, cưới hỏi, xây nhà, khai trương đều tốt."
        );
        assert_eq!(record.good_activities[0].category, "description");
        assert_eq!(record.bad_activities[0].name, "An táng, chôn cất, đào giếng.");
    }

    #[test]
    fn travel_hours_and_conflicting_ages_are_extracted() {
        let record = parser()
            .try_parse(PRIMARY_PAGE, jan_first())
            .expect("page parses");

        assert_eq!(record.travel_hours.len(), 2);
        let first = &record.travel_hours[0];
        assert_eq!(first.name, "Tốc hỷ");
        assert_eq!(first.time_range, "11h-13h, 23h-1h");
        assert!(first.is_good);
        assert_eq!(
            first.description.as_deref(),
            Some("Tin vui sắp tới. Cầu tài đi hướng Nam.")
        );
        assert!(!record.travel_hours[1].is_good);

        let ages = record.conflicting_ages.expect("ages");
        assert_eq!(ages.xung_ngay, vec!["Quý Sửu", "Đinh Sửu", "Ất Dậu", "Ất Mão"]);
        assert_eq!(ages.xung_thang.len(), 4);
    }

    #[test]
    fn inline_markup_does_not_cut_labeled_lists() {
        let html = "<html><body>\
                    <p>Hoàng đạo: <b>Tý</b>, Sửu, <i>Mão</i>, Ngọ</p>\
                    <p>Xung ngày: <b>Quý Sửu</b>, Đinh Sửu, <a href=\"#\">Ất Dậu</a>, Ất Mão</p>\
                    <p>Xung tháng: <strong>Mậu Ngọ</strong>, Nhâm Ngọ</p>\
                    </body></html>";
        let record = parser().try_parse(html, jan_first()).expect("page parses");
        assert_eq!(
            record.hoang_dao_branches(),
            vec![Branch::Ty, Branch::Suu, Branch::Mao, Branch::Ngo]
        );
        let ages = record.conflicting_ages.expect("ages");
        assert_eq!(ages.xung_ngay, vec!["Quý Sửu", "Đinh Sửu", "Ất Dậu", "Ất Mão"]);
        assert_eq!(ages.xung_thang, vec!["Mậu Ngọ", "Nhâm Ngọ"]);
    }

    #[test]
    fn score_is_computed_at_parse_time() {
        let record = parser()
            .try_parse(PRIMARY_PAGE, jan_first())
            .expect("page parses");
        assert_eq!(record.day_score, Some(score::day_score(&record)));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let record = parser()
            .try_parse("<html><body><p>Trang trống</p></body></html>", jan_first())
            .expect("page parses");
        assert_eq!(record.lunar_date.day, 1);
        assert_eq!(record.lunar_date.month, 1);
        assert_eq!(record.can_chi.day, CanChi::new(Stem::Giap, Branch::Ty));
        assert_eq!(record.can_chi.month, CanChi::new(Stem::Giap, Branch::Ty));
        assert_eq!(record.can_chi.year, CanChi::new(Stem::Giap, Branch::Thin));
        assert!(record.star28.is_none());
        assert!(record.truc12.is_none());
        assert!(record.hoang_dao_branches().is_empty());
        assert!(record.hoang_dao_hours.iter().all(|hour| hour.is_hac_dao));
        assert!(record.conflicting_ages.is_none());
        assert!(record.travel_hours.is_empty());
    }

    #[test]
    fn body_fallbacks_fill_date_and_variant_branch() {
        let html = "<html><body><p>Hôm nay 15/11 âm lịch, tháng nhuận</p>\
                    <p>Ngày: Ất Tị, tháng Mậu Dần</p>\
                    <p>Giờ Hoàng Đạo: Tý, Sửu, Mão</p><p>Giờ Hắc Đạo: Dần</p></body></html>";
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).expect("valid date");
        let record = parser().try_parse(html, date).expect("page parses");
        assert_eq!(record.lunar_date.day, 15);
        assert_eq!(record.lunar_date.month, 11);
        assert_eq!(record.lunar_date.year, 2024);
        assert!(record.lunar_date.is_leap_month);
        assert_eq!(record.can_chi.day, CanChi::new(Stem::At, Branch::Ti));
        assert_eq!(record.can_chi.month, CanChi::new(Stem::Mau, Branch::Dan));
        assert_eq!(
            record.hoang_dao_branches(),
            vec![Branch::Ty, Branch::Suu, Branch::Mao]
        );
    }

    #[test]
    fn blank_document_is_a_structural_failure() {
        let err = parser()
            .try_parse("<html><body>   </body></html>", jan_first())
            .expect_err("blank page");
        assert!(matches!(err, ParseError::EmptyDocument { .. }));
        assert!(parse("<html></html>", jan_first()).is_none());
    }

    #[test]
    fn worded_month_prefers_longer_names() {
        let html = "<html><body><span class=\"ngay-am\">5</span>\
                    <div class=\"calendar-info2\">THÁNG MƯỜI MỘT</div></body></html>";
        let date = NaiveDate::from_ymd_opt(2024, 12, 5).expect("valid date");
        let record = parser().try_parse(html, date).expect("page parses");
        assert_eq!(record.lunar_date.day, 5);
        assert_eq!(record.lunar_date.month, 11);
        assert_eq!(record.lunar_date.year, 2024);
    }
}
