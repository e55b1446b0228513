use std::io::{self, Write};
use std::sync::mpsc;

use opac_core::ItemRecord;

use crate::{CrawlEvent, RunId};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("item receiver closed")]
    Closed,
}

/// Consumer of finished items. Called once per item, in crawl order.
pub trait ItemSink: Send {
    fn emit(&mut self, record: ItemRecord) -> Result<(), SinkError>;
}

impl ItemSink for Vec<ItemRecord> {
    fn emit(&mut self, record: ItemRecord) -> Result<(), SinkError> {
        self.push(record);
        Ok(())
    }
}

/// Writes one JSON object per line and flushes after each item.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ItemSink for JsonLinesSink<W> {
    fn emit(&mut self, record: ItemRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards items as [`CrawlEvent::Item`].
pub struct ChannelItemSink {
    run_id: RunId,
    tx: mpsc::Sender<CrawlEvent>,
}

impl ChannelItemSink {
    pub fn new(run_id: RunId, tx: mpsc::Sender<CrawlEvent>) -> Self {
        Self { run_id, tx }
    }
}

impl ItemSink for ChannelItemSink {
    fn emit(&mut self, record: ItemRecord) -> Result<(), SinkError> {
        self.tx
            .send(CrawlEvent::Item {
                run_id: self.run_id,
                record,
            })
            .map_err(|_| SinkError::Closed)
    }
}
