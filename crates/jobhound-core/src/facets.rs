//! Static code tables for cities and search facets.
//!
//! The site takes machine codes in the search URL but renders human-readable
//! labels on its filter controls. These tables map one to the other. They are
//! built once on first use and never mutated; lookups return `None` for codes
//! the tables do not know so callers can decide how loudly to complain.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Label used when a city cannot be determined.
pub const UNKNOWN_CITY: &str = "未知";

const CITIES: &[(&str, &str)] = &[
    ("100010000", "全国"),
    ("101010100", "北京"),
    ("101020100", "上海"),
    ("101280100", "广州"),
    ("101280600", "深圳"),
    ("101210100", "杭州"),
    ("101270100", "成都"),
    ("101200100", "武汉"),
    ("101110100", "西安"),
    ("101190100", "南京"),
    ("101190400", "苏州"),
    ("101030100", "天津"),
    ("101040100", "重庆"),
    ("101250100", "长沙"),
    ("101180100", "郑州"),
    ("101120100", "济南"),
    ("101120200", "青岛"),
    ("101070200", "大连"),
    ("101230200", "厦门"),
    ("101230100", "福州"),
    ("101220100", "合肥"),
];

const SALARIES: &[(&str, &str)] = &[
    ("101", "5K-10K"),
    ("102", "10K以下"),
    ("103", "10K-15K"),
    ("104", "15K-20K"),
    ("105", "20K-30K"),
    ("106", "30K-50K"),
    ("107", "50K以上"),
];

const EXPERIENCES: &[(&str, &str)] = &[
    ("102", "应届生"),
    ("103", "在校/实习"),
    ("104", "1年以内"),
    ("106", "1-3年"),
    ("107", "3-5年"),
    ("108", "5-10年"),
    ("109", "10年以上"),
];

const DEGREES: &[(&str, &str)] = &[
    ("203", "大专"),
    ("204", "不限"),
    ("205", "本科"),
    ("206", "硕士"),
    ("207", "博士"),
];

static CITY_LABELS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| CITIES.iter().copied().collect());

static CITY_CODES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| CITIES.iter().map(|&(code, name)| (name, code)).collect());

static FACET_LABELS: Lazy<HashMap<(FacetKind, &'static str), &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (kind, table) in [
        (FacetKind::Salary, SALARIES),
        (FacetKind::Experience, EXPERIENCES),
        (FacetKind::Degree, DEGREES),
    ] {
        for &(code, label) in table {
            map.insert((kind, code), label);
        }
    }
    map
});

/// City names scanned for in free text, in table order. The nationwide
/// pseudo-city is not a place a listing can be in, so it is left out.
pub static KNOWN_CITIES: Lazy<Vec<&'static str>> = Lazy::new(|| {
    CITIES
        .iter()
        .map(|&(_, name)| name)
        .filter(|name| *name != "全国")
        .collect()
});

/// A search refinement dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// Salary band
    Salary,
    /// Required experience band
    Experience,
    /// Minimum degree
    Degree,
}

impl FacetKind {
    /// Query parameter name used in the search URL.
    #[must_use]
    pub fn param(self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::Experience => "experience",
            Self::Degree => "degree",
        }
    }
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

/// Human-readable name of a city code.
#[must_use]
pub fn city_label(code: &str) -> Option<&'static str> {
    CITY_LABELS.get(code).copied()
}

/// City code for a human-readable city name.
#[must_use]
pub fn city_code(name: &str) -> Option<&'static str> {
    CITY_CODES.get(name).copied()
}

/// On-page label of a facet code.
#[must_use]
pub fn facet_label(kind: FacetKind, code: &str) -> Option<&'static str> {
    FACET_LABELS.get(&(kind, code)).copied()
}
