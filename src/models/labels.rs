//! 字段显示名与解释等级
//!
//! 只用于生成显示条目，核心逻辑不解释字段含义。

use phf::phf_map;
use regex::Regex;
use std::sync::OnceLock;

/// 缺失时的显示文本（身份类字段）
pub const NOT_SPECIFIED: &str = "No especificado";
/// 缺失时的显示文本（数值类字段）
pub const NOT_AVAILABLE: &str = "N/A";

/// 显示条目中的字段与标签
pub static FIELD_LABELS: phf::Map<&'static str, &'static str> = phf_map! {
    "nombre_productor" => "Productor",
    "cultivo_establecer" => "Cultivo",
    "municipio" => "Municipio",
    "ph_agua" => "pH",
    "mo" => "M.O.",
    "fosforo" => "Fósforo",
    "potasio" => "Potasio",
};

/// 显示顺序：(字段, 单位)
pub const DISPLAY_FIELDS: [(&str, &str); 7] = [
    ("nombre_productor", ""),
    ("cultivo_establecer", ""),
    ("municipio", ""),
    ("ph_agua", ""),
    ("mo", ""),
    ("fosforo", "mg/kg"),
    ("potasio", "mg/kg"),
];

/// 解释字段前缀：`interp_<字段>`
pub const INTERPRETATION_PREFIX: &str = "interp_";

/// 身份类字段（缺失时显示 NOT_SPECIFIED）
const IDENTITY_FIELDS: [&str; 3] = ["nombre_productor", "cultivo_establecer", "municipio"];

pub fn label_for(field: &str) -> &str {
    FIELD_LABELS.get(field).copied().unwrap_or(field)
}

pub fn interpretation_key(field: &str) -> String {
    format!("{}{}", INTERPRETATION_PREFIX, field)
}

pub fn missing_text(field: &str) -> &'static str {
    if IDENTITY_FIELDS.contains(&field) {
        NOT_SPECIFIED
    } else {
        NOT_AVAILABLE
    }
}

/// 解释等级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpretation {
    High,
    Medium,
    Low,
    Unknown,
}

fn patterns() -> &'static [(Interpretation, Regex)] {
    static PATTERNS: OnceLock<Vec<(Interpretation, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (Interpretation::High, r"(?i)alto|excesivo"),
            (Interpretation::Medium, r"(?i)medio|moderado|adecuado"),
            (Interpretation::Low, r"(?i)bajo|deficiente"),
        ]
        .into_iter()
        .filter_map(|(level, pattern)| Regex::new(pattern).ok().map(|re| (level, re)))
        .collect()
    })
}

impl Interpretation {
    /// 按关键字分类，顺序与服务端报告一致：高 > 中 > 低
    pub fn classify(text: &str) -> Self {
        patterns()
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(level, _)| *level)
            .unwrap_or(Interpretation::Unknown)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Interpretation::High => "high",
            Interpretation::Medium => "medium",
            Interpretation::Low => "low",
            Interpretation::Unknown => "",
        }
    }
}
