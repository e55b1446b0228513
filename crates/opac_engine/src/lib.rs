//! OPAC crawler engine: HTTP, HTML parsing and crawl execution.
mod decode;
mod engine;
mod fetch;
mod page;
mod runner;
mod sink;
mod types;

pub use decode::{decode_html, DecodedHtml};
pub use engine::CrawlHandle;
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use page::HtmlPage;
pub use runner::run_crawl;
pub use sink::{ChannelItemSink, ItemSink, JsonLinesSink, SinkError};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    CrawlError, CrawlEvent, CrawlSummary, EngineStopped, FailureKind, FetchError, FetchMetadata,
    FetchOutput, RunId,
};
