//! Form fields for the three requests that set up a search.
//!
//! The catalog keeps search state server side, keyed by the `CSId` session
//! token, so the advanced search is built up in steps: switch to the advanced
//! form, store the restrictions, then submit the clauses. Every step must
//! carry the token read from the previous response.

use std::fmt;

use opac_logging::opac_warn;

use crate::codes;
use crate::search::{FilterSpec, SearchSpec};

/// Ordered `(key, value)` pairs, sent as the request's query string.
pub type FormFields = Vec<(String, String)>;

/// Relative URL every form step is submitted to.
pub const SEARCH_ACTION: &str = "search.do";

pub const LANGUAGE_RESTRICTION_ID: &str = "7";
pub const MEDIA_RESTRICTION_ID: &str = "6";
pub const YEAR_RESTRICTION_ID: &str = "1";

/// Largest page size the catalog accepts; fewer listing pages to walk.
pub const HITS_PER_PAGE: &str = "100";
/// "Temporary list", the only remember-list mode the form offers.
pub const REMEMBER_LIST_TEMPORARY: &str = "-1";
pub const SEARCH_TIMEOUT: &str = "120";
pub const CONSIDER_RESTRICTIONS: &str = "2";
pub const ADVANCED_SEARCH_TYPE: &str = "2";
pub const SUBMIT_LABEL: &str = "Suchen";

/// Opaque `CSId` value read from the search form's hidden input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Switch the session to the advanced search form.
    SwitchSearchPage,
    /// Store branch, language, media and year restrictions.
    Restrictions,
    /// Submit the clauses together with paging and sort settings.
    SubmitSearch,
}

/// Builds the form fields for one setup request.
///
/// The key set and order depend only on `phase`: empty clauses and absent
/// filters are sent as empty values. Unknown codes are logged and sent as-is.
pub fn build_phase_fields(
    phase: Phase,
    token: &SessionToken,
    search: &SearchSpec,
    filters: &FilterSpec,
) -> FormFields {
    match phase {
        Phase::SwitchSearchPage => vec![
            field("methodToCall", "switchSearchPage"),
            field("CSId", token.as_str()),
            field("SearchType", ADVANCED_SEARCH_TYPE),
        ],
        Phase::Restrictions => restriction_fields(token, filters),
        Phase::SubmitSearch => search_fields(token, search, filters),
    }
}

fn restriction_fields(token: &SessionToken, filters: &FilterSpec) -> FormFields {
    warn_unknown("view branch", codes::VIEW_BRANCHES, &filters.view_branch);
    warn_unknown("search branch", codes::SEARCH_BRANCHES, &filters.search_branch);
    warn_unknown("language", codes::LANGUAGES, &filters.language);
    warn_unknown("media", codes::MEDIA, &filters.media);

    let (year_start, year_end) = filters
        .years
        .map(|years| (years.start.to_string(), years.end.to_string()))
        .unwrap_or_default();

    vec![
        field("methodToCall", "submit"),
        field("CSId", token.as_str()),
        field("methodToCallParameter", "searchPreferences"),
        field("callingPage", "searchParameters"),
        field("selectedViewBranchlib", &filters.view_branch),
        field("selectedSearchBranchlib", &filters.search_branch),
        field("searchRestrictionID[0]", LANGUAGE_RESTRICTION_ID),
        field("searchRestrictionValue1[0]", &filters.language),
        field("searchRestrictionID[1]", MEDIA_RESTRICTION_ID),
        field("searchRestrictionValue1[1]", &filters.media),
        field("searchRestrictionID[2]", YEAR_RESTRICTION_ID),
        field("searchRestrictionValue1[2]", year_start),
        field("searchRestrictionValue2[2]", year_end),
    ]
}

fn search_fields(token: &SessionToken, search: &SearchSpec, filters: &FilterSpec) -> FormFields {
    let mut fields = vec![
        field("methodToCall", "submit"),
        field("CSId", token.as_str()),
        field("methodToCallParameter", "submitSearch"),
    ];

    for (index, clause) in search.clauses().iter().enumerate() {
        warn_unknown(
            &format!("search category for clause {}", index + 1),
            codes::CATEGORIES,
            &clause.category,
        );
        if index > 0 {
            if !clause.operator.is_known() {
                opac_warn!(
                    "Using unsupported search operator '{}' for clause {}",
                    clause.operator.as_form_value(),
                    index + 1
                );
            }
            fields.push(field(
                format!("combinationOperator[{index}]"),
                clause.operator.as_form_value(),
            ));
        }
        fields.push(field(format!("searchCategories[{index}]"), &clause.category));
        fields.push(field(format!("searchString[{index}]"), &clause.term));
    }

    fields.extend([
        field("submitSearch", SUBMIT_LABEL),
        field("callingPage", "searchPreferences"),
        field("exemplarSorting", filters.sort.as_form_value()),
        field("numberOfHits", HITS_PER_PAGE),
        field("rememberList", REMEMBER_LIST_TEMPORARY),
        field("timeOut", SEARCH_TIMEOUT),
        field("considerSearchRestriction", CONSIDER_RESTRICTIONS),
    ]);
    fields
}

fn field(key: impl Into<String>, value: impl Into<String>) -> (String, String) {
    (key.into(), value.into())
}

fn warn_unknown(what: &str, table: &[&str], code: &str) {
    if !codes::is_known(table, code) {
        opac_warn!("Using unsupported {} '{}'", what, code);
    }
}
