//! The crawl as a pure state machine.
//!
//! [`start`] yields the first request; every fetched page is then fed to
//! [`advance`] together with the current state, which returns the next state
//! and the effects to execute: at most one fetch and at most one finished
//! item. One crawl is strictly sequential, since each request depends on
//! the page before it.
//!
//! ```text
//! Init ─► AwaitSwitch ─► AwaitFilters ─► AwaitSearch ─┐
//!                                                     ▼
//!        ┌────────────────────────────────────── ListingPage ◄─┐
//!        ▼                                                     │
//!  DetailSummary ─► DetailAttributes ──(queue empty, next page)┘
//!        ▲                 │
//!        └──(queue left)───┘            (nothing left) ─► Terminal
//! ```

use std::collections::VecDeque;

use opac_logging::{opac_debug, opac_info, opac_warn};

use crate::merge::Attributes;
use crate::page::{query_text, Page};
use crate::query::{build_phase_fields, FormFields, Phase, SessionToken, SEARCH_ACTION};
use crate::record::{ExemplarRow, ItemRecord, EXEMPLARS_KEY, MEDIA_TYPE_KEY};
use crate::search::{CrawlPlan, EmptyPagePolicy};

/// Paths into the catalog's markup.
pub mod paths {
    pub const SESSION_TOKEN: &str = "#AdvancedSearchForm > input:nth-of-type(2)::attr(value)";
    pub const HIT_ROWS: &str = "#hitlist table tr";
    pub const HIT_MEDIA_TYPE: &str = "td:nth-of-type(1) img::attr(title)";
    pub const HIT_LINK: &str = "td:nth-of-type(2) a:nth-of-type(2)::attr(href)";
    pub const NEXT_PAGE: &str = "#hitlist a[aria-label='Nächste Seite']::attr(href)";
    pub const COPY_ROWS: &str = "#tab-content table tr:not(#bg2)";
    pub const COPY_ROW_TEXT: &str = "td::text";
    pub const TITLE_PERMALINK: &str = "#labelTitle a::attr(href)";

    pub fn copy_header(column: usize) -> String {
        format!("#tab-content table tr#bg2 > th:nth-of-type({column})::text")
    }

    pub fn copy_header_paragraph(column: usize) -> String {
        format!("#tab-content table tr#bg2 > th:nth-of-type({column}) > p::text")
    }

    pub fn copy_cell(column: usize) -> String {
        format!("td:nth-of-type({column})::text")
    }

    pub fn attribute_label(position: usize) -> String {
        format!("#tab-content table tr td strong:nth-of-type({position})::text")
    }

    pub fn attribute_value(position: usize) -> String {
        format!("#tab-content table tr td div:nth-of-type({position})::text")
    }
}

/// One row of a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRef {
    pub url: String,
    /// Media type shown as an icon title in the list; the detail page lacks it.
    pub media_type: Option<String>,
}

/// Hits of one listing page not visited yet, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingQueue {
    hits: VecDeque<HitRef>,
}

impl PendingQueue {
    pub fn pop(&mut self) -> Option<HitRef> {
        self.hits.pop_front()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

impl FromIterator<HitRef> for PendingQueue {
    fn from_iter<I: IntoIterator<Item = HitRef>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// Where the crawl stands within the current listing page.
///
/// Moved from state to state while the page's hits are visited; the next
/// page is only requested once `pending` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingCursor {
    pub pending: PendingQueue,
    pub next_listing_page: Option<String>,
}

/// A request to execute. `query` is empty for plain link follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub query: FormFields,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: FormFields::new(),
        }
    }

    pub fn form(url: impl Into<String>, query: FormFields) -> Self {
        Self {
            url: url.into(),
            query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch(Request),
    Emit(ItemRecord),
}

/// The response the crawl is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlState {
    /// The catalog's start page.
    Init,
    /// Response to the switch to the advanced search form.
    AwaitSwitch,
    /// Response to storing the restrictions.
    AwaitFilters,
    /// Response to the search submission: the first listing page.
    AwaitSearch,
    /// A later listing page.
    ListingPage,
    /// Summary page of `hit`, holding the copy table and the title permalink.
    DetailSummary { cursor: ListingCursor, hit: HitRef },
    /// Full detail page of `hit`, reached through the title permalink.
    DetailAttributes {
        cursor: ListingCursor,
        hit: HitRef,
        exemplars: Vec<ExemplarRow>,
    },
    /// Nothing left to fetch.
    Terminal,
}

impl CrawlState {
    pub fn name(&self) -> &'static str {
        match self {
            CrawlState::Init => "Init",
            CrawlState::AwaitSwitch => "AwaitSwitch",
            CrawlState::AwaitFilters => "AwaitFilters",
            CrawlState::AwaitSearch => "AwaitSearch",
            CrawlState::ListingPage => "ListingPage",
            CrawlState::DetailSummary { .. } => "DetailSummary",
            CrawlState::DetailAttributes { .. } => "DetailAttributes",
            CrawlState::Terminal => "Terminal",
        }
    }

    /// Whether the awaited page is a listing page.
    pub fn awaits_listing(&self) -> bool {
        matches!(self, CrawlState::AwaitSearch | CrawlState::ListingPage)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlState::Terminal)
    }
}

/// A page lacked something the next step depends on. Ends the crawl run.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("no session token on {url} (state {state})")]
    MissingToken { state: &'static str, url: String },
    #[error("no {what} on {url}")]
    MissingLink { what: &'static str, url: String },
    #[error("copy table on {url} has rows but no header")]
    MissingHeader { url: String },
    #[error("cannot resolve {reference:?} against {url}")]
    Unresolvable { reference: String, url: String },
    #[error("crawl already finished")]
    Finished,
}

/// Initial state and the request for the start page.
pub fn start(plan: &CrawlPlan) -> (CrawlState, Vec<Effect>) {
    (
        CrawlState::Init,
        vec![Effect::Fetch(Request::get(plan.start_url.clone()))],
    )
}

/// Consumes the page awaited by `state` and decides what comes next.
pub fn advance(
    state: CrawlState,
    plan: &CrawlPlan,
    page: &dyn Page,
) -> Result<(CrawlState, Vec<Effect>), NavigationError> {
    opac_debug!("{} <- {}", state.name(), page.url());
    match state {
        CrawlState::Init => {
            let request = setup_request(Phase::SwitchSearchPage, "Init", plan, page)?;
            Ok((CrawlState::AwaitSwitch, vec![Effect::Fetch(request)]))
        }
        CrawlState::AwaitSwitch => {
            let request = setup_request(Phase::Restrictions, "AwaitSwitch", plan, page)?;
            Ok((CrawlState::AwaitFilters, vec![Effect::Fetch(request)]))
        }
        CrawlState::AwaitFilters => {
            let request = setup_request(Phase::SubmitSearch, "AwaitFilters", plan, page)?;
            Ok((CrawlState::AwaitSearch, vec![Effect::Fetch(request)]))
        }
        CrawlState::AwaitSearch | CrawlState::ListingPage => on_listing(plan, page),
        CrawlState::DetailSummary { cursor, hit } => on_summary(cursor, hit, page),
        CrawlState::DetailAttributes {
            cursor,
            hit,
            exemplars,
        } => Ok(on_attributes(cursor, hit, exemplars, page)),
        CrawlState::Terminal => Err(NavigationError::Finished),
    }
}

fn setup_request(
    phase: Phase,
    state: &'static str,
    plan: &CrawlPlan,
    page: &dyn Page,
) -> Result<Request, NavigationError> {
    let token = query_text(page, paths::SESSION_TOKEN)
        .map(SessionToken::new)
        .ok_or_else(|| NavigationError::MissingToken {
            state,
            url: page.url().to_string(),
        })?;
    let url = resolve(page, SEARCH_ACTION)?;
    let fields = build_phase_fields(phase, &token, &plan.search, &plan.filters);
    Ok(Request::form(url, fields))
}

fn on_listing(
    plan: &CrawlPlan,
    page: &dyn Page,
) -> Result<(CrawlState, Vec<Effect>), NavigationError> {
    let mut cursor = parse_listing(page)?;
    opac_info!(
        "Listing page {} has {} hit(s){}",
        page.url(),
        cursor.pending.len(),
        if cursor.next_listing_page.is_some() {
            ", more pages follow"
        } else {
            ""
        }
    );

    if let Some(hit) = cursor.pending.pop() {
        return Ok(visit_hit(cursor, hit));
    }

    match (plan.empty_page_policy, cursor.next_listing_page) {
        (EmptyPagePolicy::Advance, Some(next)) => {
            opac_debug!("Skipping empty listing page, continuing with {}", next);
            Ok((
                CrawlState::ListingPage,
                vec![Effect::Fetch(Request::get(next))],
            ))
        }
        (EmptyPagePolicy::Stop, Some(next)) => {
            opac_warn!(
                "Listing page {} has no hits; stopping although it links to {}",
                page.url(),
                next
            );
            Ok((CrawlState::Terminal, Vec::new()))
        }
        (_, None) => Ok((CrawlState::Terminal, Vec::new())),
    }
}

/// Builds the pending queue for a listing page. Rows without a detail link
/// (header rows among them) are skipped. A next-page link that does not
/// resolve to a URL counts as absent.
pub fn parse_listing(page: &dyn Page) -> Result<ListingCursor, NavigationError> {
    let next_listing_page = query_text(page, paths::NEXT_PAGE).and_then(|href| {
        let next = page.resolve(&href);
        if next.is_none() {
            opac_warn!(
                "Ignoring unusable next page link '{}' on {}",
                href,
                page.url()
            );
        }
        next
    });

    let pending = page
        .select_scopes(paths::HIT_ROWS)
        .iter()
        .filter_map(|row| {
            let href = query_text(row.as_ref(), paths::HIT_LINK)?;
            let url = page.resolve(&href)?;
            Some(HitRef {
                url,
                media_type: query_text(row.as_ref(), paths::HIT_MEDIA_TYPE),
            })
        })
        .collect();

    Ok(ListingCursor {
        pending,
        next_listing_page,
    })
}

fn visit_hit(cursor: ListingCursor, hit: HitRef) -> (CrawlState, Vec<Effect>) {
    let request = Request::get(hit.url.clone());
    (
        CrawlState::DetailSummary { cursor, hit },
        vec![Effect::Fetch(request)],
    )
}

fn on_summary(
    cursor: ListingCursor,
    hit: HitRef,
    page: &dyn Page,
) -> Result<(CrawlState, Vec<Effect>), NavigationError> {
    let exemplars = parse_exemplars(page)?;
    let href = query_text(page, paths::TITLE_PERMALINK).ok_or_else(|| {
        NavigationError::MissingLink {
            what: "title permalink",
            url: page.url().to_string(),
        }
    })?;
    let request = Request::get(resolve(page, &href)?);
    Ok((
        CrawlState::DetailAttributes {
            cursor,
            hit,
            exemplars,
        },
        vec![Effect::Fetch(request)],
    ))
}

/// Column headers of the copy table, left to right, up to the first column
/// without text of its own or in a nested paragraph.
pub fn discover_columns(page: &dyn Page) -> Vec<String> {
    (1..)
        .map_while(|column| {
            query_text(page, &paths::copy_header(column))
                .or_else(|| query_text(page, &paths::copy_header_paragraph(column)))
        })
        .collect()
}

/// Copy rows of a summary page, keyed by the page's own header row.
pub fn parse_exemplars(page: &dyn Page) -> Result<Vec<ExemplarRow>, NavigationError> {
    let columns = discover_columns(page);
    let rows = page.select_scopes(paths::COPY_ROWS);

    if columns.is_empty() {
        let has_content = rows.iter().any(|row| {
            row.query_all(paths::COPY_ROW_TEXT)
                .iter()
                .any(|text| !text.trim().is_empty())
        });
        if has_content {
            return Err(NavigationError::MissingHeader {
                url: page.url().to_string(),
            });
        }
        return Ok(Vec::new());
    }

    Ok(rows
        .iter()
        .filter_map(|row| {
            let cells = (1..=columns.len()).map(|column| row.query_one(&paths::copy_cell(column)));
            ExemplarRow::from_cells(&columns, cells)
        })
        .collect())
}

/// Label/value pairs of a detail page, by position, up to the first missing label.
pub fn scan_attributes(page: &dyn Page, mut attributes: Attributes) -> Attributes {
    for position in 1.. {
        let Some(label) = query_text(page, &paths::attribute_label(position)) else {
            break;
        };
        let Some(value) = page.query_one(&paths::attribute_value(position)) else {
            continue;
        };
        if label.trim_end_matches(':').trim_end() == EXEMPLARS_KEY {
            opac_warn!("Ignoring reserved label '{}' on {}", label, page.url());
            continue;
        }
        attributes.insert(&label, &value);
    }
    attributes
}

fn on_attributes(
    mut cursor: ListingCursor,
    hit: HitRef,
    exemplars: Vec<ExemplarRow>,
    page: &dyn Page,
) -> (CrawlState, Vec<Effect>) {
    let mut attributes = Attributes::new();
    if let Some(media_type) = hit.media_type.as_deref() {
        attributes.insert(MEDIA_TYPE_KEY, media_type);
    }
    let record = ItemRecord::new(scan_attributes(page, attributes), exemplars);
    opac_debug!(
        "Item {} with {} attribute(s) and {} copy row(s)",
        hit.url,
        record.attributes().len(),
        record.exemplars().len()
    );

    let mut effects = vec![Effect::Emit(record)];
    if let Some(next_hit) = cursor.pending.pop() {
        let (state, fetch) = visit_hit(cursor, next_hit);
        effects.extend(fetch);
        return (state, effects);
    }

    match cursor.next_listing_page {
        Some(next) => {
            effects.push(Effect::Fetch(Request::get(next)));
            (CrawlState::ListingPage, effects)
        }
        None => (CrawlState::Terminal, effects),
    }
}

fn resolve(page: &dyn Page, reference: &str) -> Result<String, NavigationError> {
    page.resolve(reference)
        .ok_or_else(|| NavigationError::Unresolvable {
            reference: reference.to_string(),
            url: page.url().to_string(),
        })
}
