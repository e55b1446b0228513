use std::sync::LazyLock;

use opac_logging::{opac_error, opac_warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::codes::{Operator, SortKey, CATEGORIES, SEARCH_BRANCHES, VIEW_BRANCHES};

/// Entry page of the catalog's web client.
pub const DEFAULT_START_URL: &str =
    "https://lib.bonn.de/webOPACClient/start.do?Lang=de&Login=web00&BaseURL=this";

/// Number of clause slots on the advanced search form.
pub const CLAUSE_COUNT: usize = 3;

static FIRST_CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?s)(?:(?P<category>\d*):)?(?P<term>.*)$").expect("valid clause pattern")
});

static CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?s)(?:(?P<operator>[&|^]?)(?P<category>\d*):)?(?P<term>.*)$")
        .expect("valid clause pattern")
});

static YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<start>\d{4})(?::(?P<end>\d{4}))?$").expect("valid year pattern")
});

/// One search term with its category code and combination operator.
///
/// The operator of the first clause is never sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub operator: Operator,
    pub category: String,
    pub term: String,
}

impl Clause {
    pub fn new(operator: Operator, category: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            operator,
            category: category.into(),
            term: term.into(),
        }
    }

    /// A clause with an empty term does not restrict the search.
    pub fn is_inert(&self) -> bool {
        self.term.trim().is_empty()
    }
}

impl Default for Clause {
    fn default() -> Self {
        Self::new(Operator::And, CATEGORIES[0], "")
    }
}

/// Parses the first clause, `[category:]term`.
pub fn parse_first_clause(raw: &str) -> Clause {
    let mut clause = Clause::default();
    if let Some(caps) = FIRST_CLAUSE.captures(raw) {
        if let Some(category) = caps.name("category").filter(|m| !m.as_str().is_empty()) {
            clause.category = category.as_str().to_string();
        }
        if let Some(term) = caps.name("term") {
            clause.term = term.as_str().to_string();
        }
    }
    clause
}

/// Parses a follow-up clause, `[op][category:]term` with `op` one of `&`, `|`, `^`.
pub fn parse_clause(raw: &str) -> Clause {
    let mut clause = Clause::default();
    if let Some(caps) = CLAUSE.captures(raw) {
        if let Some(operator) = caps.name("operator").filter(|m| !m.as_str().is_empty()) {
            clause.operator = Operator::parse(operator.as_str());
        }
        if let Some(category) = caps.name("category").filter(|m| !m.as_str().is_empty()) {
            clause.category = category.as_str().to_string();
        }
        if let Some(term) = caps.name("term") {
            clause.term = term.as_str().to_string();
        }
    }
    clause
}

/// The three clause slots of an advanced search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpec {
    clauses: [Clause; CLAUSE_COUNT],
}

impl SearchSpec {
    /// Fills the slots in order; missing slots stay inert and extra clauses are dropped.
    pub fn from_clauses(clauses: impl IntoIterator<Item = Clause>) -> Self {
        let mut spec = Self::default();
        let mut supplied = 0;
        for (slot, clause) in clauses.into_iter().enumerate() {
            supplied = slot + 1;
            if slot < CLAUSE_COUNT {
                spec.clauses[slot] = clause;
            }
        }
        if supplied > CLAUSE_COUNT {
            opac_warn!(
                "Search form has {} clause slots; ignoring {} extra clause(s)",
                CLAUSE_COUNT,
                supplied - CLAUSE_COUNT
            );
        }
        spec
    }

    pub fn clauses(&self) -> &[Clause; CLAUSE_COUNT] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(Clause::is_inert)
    }
}

/// Inclusive publication year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum YearError {
    #[error("illegal year filter {0:?}, expected YYYY or YYYY:YYYY")]
    Malformed(String),
}

/// Parses `YYYY` (a single year) or `YYYY:YYYY`.
pub fn parse_year(raw: &str) -> Result<YearRange, YearError> {
    let malformed = || YearError::Malformed(raw.to_string());
    let caps = YEAR.captures(raw.trim()).ok_or_else(malformed)?;
    let start: u16 = caps["start"].parse().map_err(|_| malformed())?;
    let end: u16 = match caps.name("end") {
        Some(end) => end.as_str().parse().map_err(|_| malformed())?,
        None => start,
    };
    Ok(YearRange { start, end })
}

/// Result restrictions applied before the search is submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub view_branch: String,
    pub search_branch: String,
    pub language: String,
    pub media: String,
    pub years: Option<YearRange>,
    pub sort: SortKey,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            view_branch: VIEW_BRANCHES[0].to_string(),
            search_branch: SEARCH_BRANCHES[0].to_string(),
            language: String::new(),
            media: String::new(),
            years: None,
            sort: SortKey::default(),
        }
    }
}

/// What to do with a listing page that has no visitable hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EmptyPagePolicy {
    /// End the crawl, even if the page links to a next page.
    #[default]
    Stop,
    /// Follow the next-page link when there is one.
    Advance,
}

/// Everything a single crawl run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlPlan {
    pub start_url: String,
    pub search: SearchSpec,
    pub filters: FilterSpec,
    pub empty_page_policy: EmptyPagePolicy,
}

impl CrawlPlan {
    pub fn new(search: SearchSpec, filters: FilterSpec) -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            search,
            filters,
            empty_page_policy: EmptyPagePolicy::default(),
        }
    }
}

/// Raw crawl options as written by a user.
///
/// `search` is `[category:]term`; `search2`/`search3` are
/// `[op][category:]term`. Conversion never fails: bad values are logged and
/// replaced by defaults or omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlOptions {
    pub start_url: Option<String>,
    pub search: Option<String>,
    pub search2: Option<String>,
    pub search3: Option<String>,
    pub view_location: Option<String>,
    pub location: Option<String>,
    pub language: Option<String>,
    pub media: Option<String>,
    pub year: Option<String>,
    pub sort: Option<String>,
    pub empty_page_policy: EmptyPagePolicy,
}

impl CrawlOptions {
    pub fn into_plan(self) -> CrawlPlan {
        let search = SearchSpec::from_clauses([
            self.search.as_deref().map(parse_first_clause).unwrap_or_default(),
            self.search2.as_deref().map(parse_clause).unwrap_or_default(),
            self.search3.as_deref().map(parse_clause).unwrap_or_default(),
        ]);

        let mut filters = FilterSpec::default();
        if let Some(view_branch) = self.view_location {
            filters.view_branch = view_branch;
        }
        if let Some(search_branch) = self.location {
            filters.search_branch = search_branch;
        }
        if let Some(language) = self.language {
            filters.language = language;
        }
        if let Some(media) = self.media {
            filters.media = media;
        }
        if let Some(raw) = self.year.as_deref() {
            match parse_year(raw) {
                Ok(years) => filters.years = Some(years),
                Err(err) => opac_error!("{}; searching without year filter", err),
            }
        }
        if let Some(raw) = self.sort.as_deref() {
            match SortKey::parse(raw) {
                Some(sort) => filters.sort = sort,
                None => opac_warn!(
                    "Unsupported sort option '{}', sorting by {:?}",
                    raw,
                    filters.sort
                ),
            }
        }

        CrawlPlan {
            start_url: self
                .start_url
                .unwrap_or_else(|| DEFAULT_START_URL.to_string()),
            search,
            filters,
            empty_page_policy: self.empty_page_policy,
        }
    }
}
