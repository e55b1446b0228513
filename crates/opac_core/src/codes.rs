//! Option codes offered by the catalog's advanced search form.
//!
//! The tables only decide whether a value is "known"; unknown values are still
//! sent to the catalog verbatim after a warning.

/// Search categories. `-1` searches all fields.
pub const CATEGORIES: &[&str] = &[
    "-1", "100", "331", "902", "14", "700", "412", "540", "451", "425", "712",
];

/// Branches whose holdings are shown in results. `0` is the whole system.
pub const VIEW_BRANCHES: &[&str] = &["0", "2", "6", "9", "10", "11", "12", "13", "17"];

/// Branches the search is restricted to. Empty means all branches.
pub const SEARCH_BRANCHES: &[&str] = &[
    "", "0", "1", "2", "6", "7", "9", "10", "11", "12", "13", "14", "17", "20", "21",
];

/// Language restriction codes. Empty means any language.
pub const LANGUAGES: &[&str] = &[
    "", "33", "29", "23", "24", "25", "26", "27", "34", "28", "30", "35",
];

/// Media type restriction codes. Empty means any media type.
pub const MEDIA: &[&str] = &[
    "", "22", "19", "12", "36", "20", "31", "11", "15", "21", "32", "37",
];

pub fn is_known(table: &[&str], code: &str) -> bool {
    table.contains(&code)
}

/// Boolean combination of a clause with the clauses before it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Operator {
    #[default]
    And,
    Or,
    Not,
    /// Sent as-is; the catalog decides what it means.
    Other(String),
}

impl Operator {
    /// Accepts the short symbols `&`, `|`, `^` and the names `AND`, `OR`, `NOT`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "&" | "AND" => Operator::And,
            "|" | "OR" => Operator::Or,
            "^" | "NOT" => Operator::Not,
            other => Operator::Other(other.to_string()),
        }
    }

    pub fn as_form_value(&self) -> &str {
        match self {
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Operator::Other(_))
    }
}

/// Ordering of the copies shown on a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    ByLocation,
    ByStatus,
}

impl SortKey {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "location" | "bylocation" => Some(SortKey::ByLocation),
            "status" | "bystatus" => Some(SortKey::ByStatus),
            _ => None,
        }
    }

    pub fn as_form_value(self) -> &'static str {
        match self {
            SortKey::ByLocation => "1",
            SortKey::ByStatus => "2",
        }
    }
}
