//! Catalog of canonical activities used to normalize free-text "nên làm / kỵ làm" lists.

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityCategory {
    Spiritual,
    Construction,
    Business,
    Travel,
    Family,
    Health,
    Funeral,
    Agriculture,
    Education,
    Legal,
    Clothing,
    Water,
    General,
}

impl ActivityCategory {
    pub const ALL: [ActivityCategory; 13] = [
        ActivityCategory::Spiritual,
        ActivityCategory::Construction,
        ActivityCategory::Business,
        ActivityCategory::Travel,
        ActivityCategory::Family,
        ActivityCategory::Health,
        ActivityCategory::Funeral,
        ActivityCategory::Agriculture,
        ActivityCategory::Education,
        ActivityCategory::Legal,
        ActivityCategory::Clothing,
        ActivityCategory::Water,
        ActivityCategory::General,
    ];

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        Self::ALL.into_iter().find(|category| category.as_str() == key)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityCategory::Spiritual => "spiritual",
            ActivityCategory::Construction => "construction",
            ActivityCategory::Business => "business",
            ActivityCategory::Travel => "travel",
            ActivityCategory::Family => "family",
            ActivityCategory::Health => "health",
            ActivityCategory::Funeral => "funeral",
            ActivityCategory::Agriculture => "agriculture",
            ActivityCategory::Education => "education",
            ActivityCategory::Legal => "legal",
            ActivityCategory::Clothing => "clothing",
            ActivityCategory::Water => "water",
            ActivityCategory::General => "general",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActivityCategory::Spiritual => "Tâm linh",
            ActivityCategory::Construction => "Xây dựng",
            ActivityCategory::Business => "Kinh doanh",
            ActivityCategory::Travel => "Xuất hành",
            ActivityCategory::Family => "Gia đình",
            ActivityCategory::Health => "Sức khỏe",
            ActivityCategory::Funeral => "Tang lễ",
            ActivityCategory::Agriculture => "Nông nghiệp",
            ActivityCategory::Education => "Học tập",
            ActivityCategory::Legal => "Pháp lý",
            ActivityCategory::Clothing => "May mặc",
            ActivityCategory::Water => "Thủy",
            ActivityCategory::General => "Chung",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub id: &'static str,
    pub name: &'static str,
    pub name_en: &'static str,
    pub category: ActivityCategory,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
}

macro_rules! activity {
    ($id:literal, $name:literal, $en:literal, $cat:ident, [$($alias:literal),*], [$($kw:literal),*]) => {
        Activity {
            id: $id,
            name: $name,
            name_en: $en,
            category: ActivityCategory::$cat,
            aliases: &[$($alias),*],
            keywords: &[$($kw),*],
        }
    };
}

pub const CATALOG: &[Activity] = &[
    activity!("cau_an", "Cầu an", "Pray for peace", Spiritual, ["cầu an giải hạn", "cầu bình an"], ["cầu an", "cầu bình an"]),
    activity!("cau_tu", "Cầu tự", "Pray for children", Spiritual, ["cầu con", "cầu tự tử tôn"], ["cầu tự", "cầu con"]),
    activity!("giai_han", "Giải hạn", "Remove bad luck", Spiritual, ["giải hạn sao", "tống hạn"], ["giải hạn", "tống hạn"]),
    activity!("cung_te", "Cúng tế", "Worship", Spiritual, ["cúng lễ", "tế lễ", "cúng bái"], ["cúng", "tế", "lễ bái"]),
    activity!("cau_phuc", "Cầu phúc", "Pray for blessing", Spiritual, ["cầu phước", "cầu lộc"], ["cầu phúc", "cầu phước"]),
    activity!("cau_tai", "Cầu tài", "Pray for wealth", Spiritual, ["cầu tài lộc", "cầu lộc"], ["cầu tài", "cầu lộc"]),
    activity!("dong_tho", "Động thổ", "Break ground", Construction, ["khởi công", "động đất", "đào móng"], ["động thổ", "khởi công", "đào móng"]),
    activity!("xay_nha", "Xây nhà", "Build house", Construction, ["xây cất", "xây dựng nhà", "cất nhà", "khởi tạo"], ["xây nhà", "xây cất", "cất nhà", "khởi tạo"]),
    activity!("sua_chua", "Sửa chữa", "Repair", Construction, ["sửa nhà", "tu sửa", "tu bổ"], ["sửa chữa", "sửa nhà", "tu sửa"]),
    activity!("lop_mai", "Lợp mái", "Roof", Construction, ["che mái", "dựng hiên", "cất nóc"], ["lợp mái", "che mái", "cất nóc"]),
    activity!("tro_cua", "Trổ cửa", "Make door", Construction, ["dựng cửa", "gắn cửa", "làm cửa"], ["trổ cửa", "dựng cửa", "gắn cửa"]),
    activity!("xay_lau_gac", "Xây lầu gác", "Build tower", Construction, ["xây gác", "xây lầu"], ["lầu gác", "xây gác"]),
    activity!("khai_truong", "Khai trương", "Grand opening", Business, ["khai nghiệp", "mở cửa hàng", "khai thị"], ["khai trương", "khai nghiệp", "mở cửa"]),
    activity!("ky_hop_dong", "Ký hợp đồng", "Sign contract", Business, ["ký kết", "giao ước", "lập văn tự"], ["ký hợp đồng", "ký kết", "giao ước"]),
    activity!("giao_dich", "Giao dịch", "Transaction", Business, ["mua bán", "buôn bán", "thương mại"], ["giao dịch", "mua bán", "buôn bán"]),
    activity!("mo_kho", "Mở kho", "Open warehouse", Business, ["xuất kho", "nhập kho"], ["mở kho", "xuất kho", "nhập kho"]),
    activity!("xuat_hanh", "Xuất hành", "Travel", Travel, ["đi xa", "du hành", "lên đường"], ["xuất hành", "đi xa", "lên đường"]),
    activity!("di_thuyen", "Đi thuyền", "Boat travel", Travel, ["đi ghe", "đi tàu thủy"], ["đi thuyền", "đi ghe", "thuyền bè"]),
    activity!("cuoi_hoi", "Cưới hỏi", "Wedding", Family, ["cưới gả", "hôn nhân", "thành hôn", "giá thú"], ["cưới", "hỏi", "hôn nhân", "giá thú"]),
    activity!("an_hoi", "Ăn hỏi", "Engagement", Family, ["lễ hỏi", "đính hôn", "dạm ngõ"], ["ăn hỏi", "lễ hỏi", "đính hôn"]),
    activity!("nhap_trach", "Nhập trạch", "Move in", Family, ["dọn nhà", "về nhà mới", "tân gia"], ["nhập trạch", "dọn nhà", "tân gia"]),
    activity!("sinh_con", "Sinh con", "Give birth", Family, ["sanh con", "đẻ con"], ["sinh con", "sanh con"]),
    activity!("kham_benh", "Khám bệnh", "Medical checkup", Health, ["đi bác sĩ", "chữa bệnh", "trị bệnh"], ["khám bệnh", "chữa bệnh", "trị bệnh"]),
    activity!("cham_cuu", "Châm cứu", "Acupuncture", Health, ["châm chích", "bấm huyệt"], ["châm cứu", "châm chích"]),
    activity!("uong_thuoc", "Uống thuốc", "Take medicine", Health, ["dùng thuốc", "uống thuốc lần đầu"], ["uống thuốc", "dùng thuốc"]),
    activity!("an_tang", "An táng", "Burial", Funeral, ["chôn cất", "hạ huyệt", "mai táng"], ["an táng", "chôn cất", "mai táng"]),
    activity!("cai_tang", "Cải táng", "Reburial", Funeral, ["bốc mộ", "di dời mộ"], ["cải táng", "bốc mộ"]),
    activity!("lam_mo", "Làm mộ", "Build tomb", Funeral, ["xây mộ", "đắp mộ", "sửa mộ"], ["làm mộ", "xây mộ", "đắp mộ"]),
    activity!("trong_trot", "Trồng trọt", "Planting", Agriculture, ["gieo trồng", "gieo hạt", "cấy lúa"], ["trồng trọt", "gieo trồng", "gieo hạt"]),
    activity!("chan_nuoi", "Chăn nuôi", "Livestock", Agriculture, ["nuôi gia súc", "nuôi gia cầm"], ["chăn nuôi", "nuôi"]),
    activity!("thu_hoach", "Thu hoạch", "Harvest", Agriculture, ["gặt hái", "thu gom"], ["thu hoạch", "gặt hái"]),
    activity!("nhap_hoc", "Nhập học", "Enroll", Education, ["vào học", "bái sư"], ["nhập học", "vào học", "bái sư"]),
    activity!("thi_cu", "Thi cử", "Examination", Education, ["đi thi", "ứng thí", "khoa cử"], ["thi cử", "đi thi", "khoa cử"]),
    activity!("kien_tung", "Kiện tụng", "Lawsuit", Legal, ["ra tòa", "tranh tụng", "kiện cáo"], ["kiện tụng", "kiện cáo", "tranh tụng"]),
    activity!("cat_ao", "Cắt áo", "Cut cloth", Clothing, ["cắt may", "may áo", "may đồ", "cắt vải"], ["cắt áo", "cắt may", "may áo"]),
    activity!("dao_gieng", "Đào giếng", "Dig well", Water, ["khoan giếng", "đào ao"], ["đào giếng", "khoan giếng"]),
    activity!("thuy_loi", "Thủy lợi", "Irrigation", Water, ["làm kênh", "đắp đê"], ["thủy lợi", "kênh mương"]),
    activity!("lam_thuyen", "Làm thuyền", "Build boat", Water, ["đóng thuyền", "sửa thuyền", "hạ thủy"], ["làm thuyền", "đóng thuyền", "hạ thủy"]),
];

pub fn by_id(id: &str) -> Option<&'static Activity> {
    CATALOG.iter().find(|activity| activity.id == id)
}

pub fn by_category(category: ActivityCategory) -> Vec<&'static Activity> {
    CATALOG
        .iter()
        .filter(|activity| activity.category == category)
        .collect()
}

/// Exact name or alias first, then the first keyword contained in `text`.
pub fn match_activity(text: &str) -> Option<&'static Activity> {
    let lower = text.trim().to_lowercase();
    let exact = CATALOG.iter().find(|activity| {
        activity.name.to_lowercase() == lower
            || activity.aliases.iter().any(|alias| alias.to_lowercase() == lower)
    });
    exact.or_else(|| {
        CATALOG.iter().find(|activity| {
            activity
                .keywords
                .iter()
                .any(|keyword| lower.contains(&keyword.to_lowercase()))
        })
    })
}

/// Every catalog entry with a keyword occurring in a free-text description, catalog order.
pub fn extract_activities(text: &str) -> Vec<&'static Activity> {
    let lower = text.to_lowercase();
    CATALOG
        .iter()
        .filter(|activity| {
            activity
                .keywords
                .iter()
                .any(|keyword| lower.contains(&keyword.to_lowercase()))
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub n: &'static str,
    pub c: &'static str,
}

/// `id -> {n, c}` map embedded in the compact export.
pub fn export_reference() -> BTreeMap<&'static str, CatalogEntry> {
    CATALOG
        .iter()
        .map(|activity| {
            (
                activity.id,
                CatalogEntry {
                    n: activity.name,
                    c: activity.category.as_str(),
                },
            )
        })
        .collect()
}
