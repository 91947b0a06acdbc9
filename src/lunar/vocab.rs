//! Closed vocabularies of the Vietnamese lunar calendar.
//!
//! Every extracted value is validated by looking it up here; a lookup miss is
//! how the parsers learn that a heuristic did not find anything usable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thiên Can: the ten heavenly stems, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stem {
    #[serde(rename = "Giáp")]
    Giap,
    #[serde(rename = "Ất")]
    At,
    #[serde(rename = "Bính")]
    Binh,
    #[serde(rename = "Đinh")]
    Dinh,
    #[serde(rename = "Mậu")]
    Mau,
    #[serde(rename = "Kỷ")]
    Ky,
    #[serde(rename = "Canh")]
    Canh,
    #[serde(rename = "Tân")]
    Tan,
    #[serde(rename = "Nhâm")]
    Nham,
    #[serde(rename = "Quý")]
    Quy,
}

impl Stem {
    pub const ALL: [Stem; 10] = [
        Stem::Giap,
        Stem::At,
        Stem::Binh,
        Stem::Dinh,
        Stem::Mau,
        Stem::Ky,
        Stem::Canh,
        Stem::Tan,
        Stem::Nham,
        Stem::Quy,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stem::Giap => "Giáp",
            Stem::At => "Ất",
            Stem::Binh => "Bính",
            Stem::Dinh => "Đinh",
            Stem::Mau => "Mậu",
            Stem::Ky => "Kỷ",
            Stem::Canh => "Canh",
            Stem::Tan => "Tân",
            Stem::Nham => "Nhâm",
            Stem::Quy => "Quý",
        }
    }

    pub fn sinograph(self) -> char {
        match self {
            Stem::Giap => '甲',
            Stem::At => '乙',
            Stem::Binh => '丙',
            Stem::Dinh => '丁',
            Stem::Mau => '戊',
            Stem::Ky => '己',
            Stem::Canh => '庚',
            Stem::Tan => '辛',
            Stem::Nham => '壬',
            Stem::Quy => '癸',
        }
    }

    pub fn from_name(raw: &str) -> Option<Stem> {
        let trimmed = raw.trim();
        Stem::ALL.into_iter().find(|stem| stem.name() == trimmed)
    }

    pub fn from_sinograph(raw: &str) -> Option<Stem> {
        let mut chars = raw.trim().chars();
        let ch = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Stem::ALL.into_iter().find(|stem| stem.sinograph() == ch)
    }

    /// Adjacent stems share an element: Giáp/Ất are Wood, Bính/Đinh Fire, and so on.
    pub fn element(self) -> Element {
        match self {
            Stem::Giap | Stem::At => Element::Moc,
            Stem::Binh | Stem::Dinh => Element::Hoa,
            Stem::Mau | Stem::Ky => Element::Tho,
            Stem::Canh | Stem::Tan => Element::Kim,
            Stem::Nham | Stem::Quy => Element::Thuy,
        }
    }
}

impl fmt::Display for Stem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The orthographic variant of Tỵ accepted on input.
pub const BRANCH_TY_VARIANT: &str = "Tị";

/// Địa Chi: the twelve earthly branches, in cycle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "Tý")]
    Ty,
    #[serde(rename = "Sửu")]
    Suu,
    #[serde(rename = "Dần")]
    Dan,
    #[serde(rename = "Mão")]
    Mao,
    #[serde(rename = "Thìn")]
    Thin,
    #[serde(rename = "Tỵ", alias = "Tị")]
    Ti,
    #[serde(rename = "Ngọ")]
    Ngo,
    #[serde(rename = "Mùi")]
    Mui,
    #[serde(rename = "Thân")]
    Than,
    #[serde(rename = "Dậu")]
    Dau,
    #[serde(rename = "Tuất")]
    Tuat,
    #[serde(rename = "Hợi")]
    Hoi,
}

impl Branch {
    pub const ALL: [Branch; 12] = [
        Branch::Ty,
        Branch::Suu,
        Branch::Dan,
        Branch::Mao,
        Branch::Thin,
        Branch::Ti,
        Branch::Ngo,
        Branch::Mui,
        Branch::Than,
        Branch::Dau,
        Branch::Tuat,
        Branch::Hoi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Branch::Ty => "Tý",
            Branch::Suu => "Sửu",
            Branch::Dan => "Dần",
            Branch::Mao => "Mão",
            Branch::Thin => "Thìn",
            Branch::Ti => "Tỵ",
            Branch::Ngo => "Ngọ",
            Branch::Mui => "Mùi",
            Branch::Than => "Thân",
            Branch::Dau => "Dậu",
            Branch::Tuat => "Tuất",
            Branch::Hoi => "Hợi",
        }
    }

    pub fn sinograph(self) -> char {
        match self {
            Branch::Ty => '子',
            Branch::Suu => '丑',
            Branch::Dan => '寅',
            Branch::Mao => '卯',
            Branch::Thin => '辰',
            Branch::Ti => '巳',
            Branch::Ngo => '午',
            Branch::Mui => '未',
            Branch::Than => '申',
            Branch::Dau => '酉',
            Branch::Tuat => '戌',
            Branch::Hoi => '亥',
        }
    }

    pub fn index(self) -> usize {
        Branch::ALL
            .iter()
            .position(|branch| *branch == self)
            .unwrap_or_default()
    }

    pub fn from_name(raw: &str) -> Option<Branch> {
        let canonical = normalize_branch(raw);
        Branch::ALL
            .into_iter()
            .find(|branch| branch.name() == canonical)
    }

    pub fn from_sinograph(raw: &str) -> Option<Branch> {
        let mut chars = raw.trim().chars();
        let ch = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Branch::ALL.into_iter().find(|branch| branch.sinograph() == ch)
    }

    /// Two-hour window of this branch: Tý starts at 23:00, each later branch two hours on.
    pub fn time_range(self) -> String {
        let start = (self.index() * 2 + 23) % 24;
        let end = (start + 2) % 24;
        format!("{start:02}:00 - {end:02}:00")
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map the accepted variant spelling to the canonical one; every other input is
/// returned trimmed and otherwise untouched.
pub fn normalize_branch(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == BRANCH_TY_VARIANT {
        return Branch::Ti.name().to_string();
    }
    trimmed.to_string()
}

/// Regex alternation over the ten stems.
pub fn stem_alternation() -> String {
    Stem::ALL
        .iter()
        .map(|stem| stem.name())
        .collect::<Vec<_>>()
        .join("|")
}

/// Regex alternation over the twelve branches plus the accepted variant.
pub fn branch_alternation() -> String {
    let mut names: Vec<&str> = Branch::ALL.iter().map(|branch| branch.name()).collect();
    names.push(BRANCH_TY_VARIANT);
    names.join("|")
}

/// Ngũ hành.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    #[serde(rename = "Mộc")]
    Moc,
    #[serde(rename = "Hỏa")]
    Hoa,
    #[serde(rename = "Thổ")]
    Tho,
    #[serde(rename = "Kim")]
    Kim,
    #[serde(rename = "Thủy")]
    Thuy,
}

impl Element {
    pub fn name(self) -> &'static str {
        match self {
            Element::Moc => "Mộc",
            Element::Hoa => "Hỏa",
            Element::Tho => "Thổ",
            Element::Kim => "Kim",
            Element::Thuy => "Thủy",
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Nhị thập bát tú with the polarity each constellation carries.
pub const STAR28: [(&str, bool); 28] = [
    ("Giác", true),
    ("Cang", false),
    ("Đê", false),
    ("Phòng", true),
    ("Tâm", false),
    ("Vĩ", true),
    ("Cơ", true),
    ("Đẩu", true),
    ("Ngưu", false),
    ("Nữ", false),
    ("Hư", false),
    ("Nguy", false),
    ("Thất", true),
    ("Bích", true),
    ("Khuê", false),
    ("Lâu", true),
    ("Vị", true),
    ("Mão", false),
    ("Tất", true),
    ("Chủy", false),
    ("Sâm", false),
    ("Tỉnh", true),
    ("Quỷ", false),
    ("Liễu", false),
    ("Tinh", false),
    ("Trương", true),
    ("Dực", false),
    ("Chẩn", true),
];

/// Thập nhị trực with polarity.
pub const TRUC12: [(&str, bool); 12] = [
    ("Kiến", true),
    ("Trừ", true),
    ("Mãn", true),
    ("Bình", true),
    ("Định", true),
    ("Chấp", true),
    ("Phá", false),
    ("Nguy", false),
    ("Thành", true),
    ("Thu", true),
    ("Khai", true),
    ("Bế", false),
];

fn lookup_polarity(table: &[(&'static str, bool)], raw: &str) -> Option<(&'static str, bool)> {
    let trimmed = raw.trim();
    table
        .iter()
        .find(|(name, _)| name.to_lowercase() == trimmed.to_lowercase())
        .copied()
}

/// Canonical spelling and polarity of a 28-constellation name.
pub fn star28(raw: &str) -> Option<(&'static str, bool)> {
    lookup_polarity(&STAR28, raw)
}

/// Canonical spelling and polarity of a 12-truc name.
pub fn truc12(raw: &str) -> Option<(&'static str, bool)> {
    lookup_polarity(&TRUC12, raw)
}

/// The 24 solar terms in calendar order, with the sinograph spellings the
/// calculation engine may emit (simplified first, traditional second).
pub const SOLAR_TERMS: [(&str, &[&str]); 24] = [
    ("Tiểu hàn", &["小寒"]),
    ("Đại hàn", &["大寒"]),
    ("Lập xuân", &["立春"]),
    ("Vũ thủy", &["雨水"]),
    ("Kinh trập", &["惊蛰", "驚蟄"]),
    ("Xuân phân", &["春分"]),
    ("Thanh minh", &["清明"]),
    ("Cốc vũ", &["谷雨", "穀雨"]),
    ("Lập hạ", &["立夏"]),
    ("Tiểu mãn", &["小满", "小滿"]),
    ("Mang chủng", &["芒种", "芒種"]),
    ("Hạ chí", &["夏至"]),
    ("Tiểu thử", &["小暑"]),
    ("Đại thử", &["大暑"]),
    ("Lập thu", &["立秋"]),
    ("Xử thử", &["处暑", "處暑"]),
    ("Bạch lộ", &["白露"]),
    ("Thu phân", &["秋分"]),
    ("Hàn lộ", &["寒露"]),
    ("Sương giáng", &["霜降"]),
    ("Lập đông", &["立冬"]),
    ("Tiểu tuyết", &["小雪"]),
    ("Đại tuyết", &["大雪"]),
    ("Đông chí", &["冬至"]),
];

pub fn solar_term_names() -> impl Iterator<Item = &'static str> {
    SOLAR_TERMS.iter().map(|(name, _)| *name)
}

pub fn solar_term_from_sinograph(raw: &str) -> Option<&'static str> {
    let trimmed = raw.trim();
    SOLAR_TERMS
        .iter()
        .find(|(_, spellings)| spellings.contains(&trimmed))
        .map(|(name, _)| *name)
}

/// Compass headings, longest first so alternations prefer the combined names.
pub const DIRECTIONS: [&str; 12] = [
    "Chính Đông",
    "Chính Tây",
    "Chính Nam",
    "Chính Bắc",
    "Đông Bắc",
    "Đông Nam",
    "Tây Bắc",
    "Tây Nam",
    "Đông",
    "Tây",
    "Nam",
    "Bắc",
];

pub fn direction_alternation() -> String {
    DIRECTIONS
        .iter()
        .map(|d| regex::escape(d))
        .collect::<Vec<_>>()
        .join("|")
}

/// Lunar month names as written after "tháng". Multi-word forms come first so
/// "tháng mười một" is not read as "tháng mười".
pub const LUNAR_MONTH_NAMES: [(&str, u8); 19] = [
    ("mười một", 11),
    ("mười hai", 12),
    ("giêng", 1),
    ("chạp", 12),
    ("mười", 10),
    ("một", 1),
    ("nhất", 1),
    ("hai", 2),
    ("nhị", 2),
    ("ba", 3),
    ("tam", 3),
    ("tư", 4),
    ("bốn", 4),
    ("năm", 5),
    ("sáu", 6),
    ("bảy", 7),
    ("bẩy", 7),
    ("tám", 8),
    ("chín", 9),
];

/// Giờ xuất hành theo Lý Thuần Phong: six named hours, each with a fixed polarity.
pub const TRAVEL_HOURS: [(&str, bool); 6] = [
    ("Tốc hỷ", true),
    ("Đại an", true),
    ("Tiểu cát", true),
    ("Lưu niên", false),
    ("Xích khẩu", false),
    ("Không vong", false),
];
