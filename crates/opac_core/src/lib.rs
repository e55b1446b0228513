//! OPAC crawler core: search model, form building and the crawl state machine.
//!
//! Nothing in this crate performs IO. Pages come in through the [`Page`]
//! trait and requests go out as [`Effect`]s.
mod codes;
mod crawl;
mod merge;
mod page;
mod query;
mod record;
mod search;

pub use codes::{
    is_known, Operator, SortKey, CATEGORIES, LANGUAGES, MEDIA, SEARCH_BRANCHES, VIEW_BRANCHES,
};
pub use crawl::{
    advance, discover_columns, parse_exemplars, parse_listing, paths, scan_attributes, start,
    CrawlState, Effect, HitRef, ListingCursor, NavigationError, PendingQueue, Request,
};
pub use merge::{AttrValue, Attributes};
pub use page::{query_text, Page, Selection};
pub use query::{
    build_phase_fields, FormFields, Phase, SessionToken, ADVANCED_SEARCH_TYPE,
    CONSIDER_RESTRICTIONS, HITS_PER_PAGE, LANGUAGE_RESTRICTION_ID, MEDIA_RESTRICTION_ID,
    REMEMBER_LIST_TEMPORARY, SEARCH_ACTION, SEARCH_TIMEOUT, SUBMIT_LABEL, YEAR_RESTRICTION_ID,
};
pub use record::{ExemplarRow, ItemRecord, EXEMPLARS_KEY, MEDIA_TYPE_KEY};
pub use search::{
    parse_clause, parse_first_clause, parse_year, Clause, CrawlOptions, CrawlPlan,
    EmptyPagePolicy, FilterSpec, SearchSpec, YearError, YearRange, CLAUSE_COUNT,
    DEFAULT_START_URL,
};
