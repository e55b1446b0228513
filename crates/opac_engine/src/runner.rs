use opac_core::{advance, start, CrawlPlan, CrawlState, Effect, NavigationError};
use opac_logging::{opac_debug, opac_info};
use tokio_util::sync::CancellationToken;

use crate::decode::decode_html;
use crate::fetch::Fetcher;
use crate::page::HtmlPage;
use crate::sink::ItemSink;
use crate::{CrawlError, CrawlSummary};

/// Runs one crawl to completion, handing every finished item to `sink`.
///
/// Requests are issued one at a time. Cancelling `cancel` drops the current
/// state, pending hits included, and returns [`CrawlError::Cancelled`].
pub async fn run_crawl(
    fetcher: &dyn Fetcher,
    plan: &CrawlPlan,
    sink: &mut dyn ItemSink,
    cancel: &CancellationToken,
) -> Result<CrawlSummary, CrawlError> {
    opac_info!("Starting crawl at {}", plan.start_url);
    let mut summary = CrawlSummary::default();
    let (mut state, mut effects) = start(plan);

    loop {
        let mut next_request = None;
        for effect in effects {
            match effect {
                Effect::Emit(record) => {
                    sink.emit(record)?;
                    summary.items += 1;
                }
                Effect::Fetch(request) => next_request = Some(request),
            }
        }

        let Some(request) = next_request else {
            break;
        };
        if cancel.is_cancelled() {
            return Err(CrawlError::Cancelled);
        }

        opac_debug!("{}: fetching {}", state.name(), request.url);
        let output = tokio::select! {
            _ = cancel.cancelled() => return Err(CrawlError::Cancelled),
            output = fetcher.fetch(&request) => output?,
        };
        summary.requests += 1;
        if state.awaits_listing() {
            summary.listing_pages += 1;
        }

        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        // The parsed document is not Send; it must be gone before the next await.
        (state, effects) = {
            let page = HtmlPage::parse(&decoded.html, &output.metadata.final_url).map_err(|_| {
                NavigationError::Unresolvable {
                    reference: output.metadata.final_url.clone(),
                    url: request.url.clone(),
                }
            })?;
            advance(state, plan, &page)?
        };
    }

    debug_assert!(matches!(state, CrawlState::Terminal));
    opac_info!(
        "Crawl finished: {} item(s) from {} listing page(s), {} request(s)",
        summary.items,
        summary.listing_pages,
        summary.requests
    );
    Ok(summary)
}
