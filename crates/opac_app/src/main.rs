mod config;

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use opac_engine::{
    CrawlEvent, CrawlHandle, EngineStopped, ItemSink, JsonLinesSink, RunId, SinkError,
};
use opac_logging::{opac_error, opac_info};

use crate::config::{load_config, AppConfig};

const EVENT_POLL: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    let Some(path) = std::env::args_os().nth(1).map(PathBuf::from) else {
        eprintln!("usage: opac_app <config.ron>");
        return ExitCode::from(2);
    };
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };
    // Validated by load_config.
    let level = config.level().unwrap_or(log::LevelFilter::Info);
    opac_logging::initialize(&config.log_destination(), level);

    match run(&config) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            opac_error!("{} of {} search(es) failed", failed, config.searches.len());
            ExitCode::FAILURE
        }
        Err(err) => {
            opac_error!("Writing items failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write + Send>> {
    let Some(path) = path else {
        return Ok(Box::new(io::stdout()));
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(Box::new(BufWriter::new(File::create(path)?)))
}

/// Runs the configured searches one after another. Returns how many failed.
fn run(config: &AppConfig) -> Result<usize, SinkError> {
    let mut sink = JsonLinesSink::new(open_output(config.output.as_deref())?);
    let handle = CrawlHandle::new(config.fetch_settings());
    let mut failed = 0;

    for (index, search) in config.searches.iter().enumerate() {
        let run_id = index as RunId;
        opac_info!("Search '{}' starting", search.name);
        handle.start(run_id, search.options.clone().into_plan());
        match drain_run(|| handle.recv_timeout(EVENT_POLL), &search.name, &mut sink) {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(err) => {
                handle.cancel(run_id);
                return Err(err);
            }
        }
    }
    Ok(failed)
}

/// Writes a run's items until it finishes. Returns whether it succeeded.
///
/// A stopped engine counts as a failed run.
fn drain_run<E>(mut next_event: E, name: &str, sink: &mut dyn ItemSink) -> Result<bool, SinkError>
where
    E: FnMut() -> Result<Option<CrawlEvent>, EngineStopped>,
{
    loop {
        let event = match next_event() {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(stopped) => {
                opac_error!("Search '{}' lost: {}", name, stopped);
                return Ok(false);
            }
        };
        match event {
            CrawlEvent::Item { record, .. } => sink.emit(record)?,
            CrawlEvent::Finished { result, .. } => {
                return Ok(match result {
                    Ok(summary) => {
                        opac_info!(
                            "Search '{}' done: {} item(s), {} listing page(s)",
                            name,
                            summary.items,
                            summary.listing_pages
                        );
                        true
                    }
                    Err(err) => {
                        opac_error!("Search '{}' failed: {}", name, err);
                        false
                    }
                });
            }
        }
    }
}
