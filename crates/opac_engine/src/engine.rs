use std::collections::HashMap;
use std::future::Future;
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use opac_core::CrawlPlan;
use opac_logging::{opac_debug, opac_error, opac_warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::fetch::{FetchSettings, ReqwestFetcher};
use crate::runner::run_crawl;
use crate::sink::ChannelItemSink;
use crate::{CrawlError, CrawlEvent, EngineStopped, RunId};

enum CrawlCommand {
    Start { run_id: RunId, plan: CrawlPlan },
    Cancel { run_id: RunId },
}

/// Runs independent crawls on a background tokio runtime.
///
/// Each run gets its own fetcher and cookie session; runs share nothing but
/// the event channel.
pub struct CrawlHandle {
    cmd_tx: mpsc::Sender<CrawlCommand>,
    event_rx: mpsc::Receiver<CrawlEvent>,
}

impl CrawlHandle {
    pub fn new(settings: FetchSettings) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    opac_error!("Failed to start crawl runtime: {}", err);
                    return;
                }
            };
            let mut runs: HashMap<RunId, (CancellationToken, JoinHandle<()>)> = HashMap::new();

            while let Ok(command) = cmd_rx.recv() {
                runs.retain(|_, (_, task)| !task.is_finished());
                match command {
                    CrawlCommand::Start { run_id, plan } => {
                        if runs.contains_key(&run_id) {
                            opac_warn!("Run {} is already active; ignoring start", run_id);
                            continue;
                        }
                        let cancel = CancellationToken::new();
                        let run = execute_run(
                            run_id,
                            plan,
                            settings.clone(),
                            cancel.clone(),
                            event_tx.clone(),
                        );
                        let task = runtime.spawn(supervise(run_id, event_tx.clone(), run));
                        runs.insert(run_id, (cancel, task));
                    }
                    CrawlCommand::Cancel { run_id } => match runs.get(&run_id) {
                        Some((cancel, _)) => cancel.cancel(),
                        None => opac_debug!("Run {} is not active; nothing to cancel", run_id),
                    },
                }
            }

            for (cancel, _) in runs.values() {
                cancel.cancel();
            }
        });

        Self { cmd_tx, event_rx }
    }

    pub fn start(&self, run_id: RunId, plan: CrawlPlan) {
        let _ = self.cmd_tx.send(CrawlCommand::Start { run_id, plan });
    }

    pub fn cancel(&self, run_id: RunId) {
        let _ = self.cmd_tx.send(CrawlCommand::Cancel { run_id });
    }

    /// Next pending event, if any. Fails once the engine thread is gone.
    pub fn try_recv(&self) -> Result<Option<CrawlEvent>, EngineStopped> {
        match self.event_rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(EngineStopped),
        }
    }

    /// Waits up to `timeout` for an event. Fails once the engine thread is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<CrawlEvent>, EngineStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }
}

/// Runs `run` as its own task and turns a panic into a `Finished` event.
async fn supervise<F>(run_id: RunId, event_tx: mpsc::Sender<CrawlEvent>, run: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(err) = tokio::spawn(run).await {
        opac_error!("Run {} aborted: {}", run_id, err);
        let _ = event_tx.send(CrawlEvent::Finished {
            run_id,
            result: Err(CrawlError::Aborted(err.to_string())),
        });
    }
}

async fn execute_run(
    run_id: RunId,
    plan: CrawlPlan,
    settings: FetchSettings,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<CrawlEvent>,
) {
    let result = match ReqwestFetcher::new(settings) {
        Ok(fetcher) => {
            let mut sink = ChannelItemSink::new(run_id, event_tx.clone());
            run_crawl(&fetcher, &plan, &mut sink, &cancel).await
        }
        Err(err) => Err(CrawlError::Transport(err)),
    };
    if let Err(err) = &result {
        opac_warn!("Run {} ended early: {}", run_id, err);
    }
    let _ = event_tx.send(CrawlEvent::Finished { run_id, result });
}
