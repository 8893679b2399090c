//! Turns a [`CfgDocument`] into a [`Configuration`] plus the driver handles
//! that still need a live `PipeId` before they can be spawned.
//!
//! Destinations own their worker thread the moment they're added to the
//! `Configuration` (`DestinationEndpoint::new` takes an already-spawned
//! `DestinationRuntime`, the same pattern `logpipe-contract-tests`'
//! scenario cases use); sources don't — a `SourceEndpoint`/`InternalMarkSource`
//! graph node is just a forwarding link, so the real `ThreadedSourceDriver`
//! is only spawned once `PipelineCompiler::compile` has handed back the
//! `PipeId` a `SourceRuntime` needs to be addressed by.

use std::sync::Arc;
use std::time::Duration;

use logpipe_core::compiler::{Configuration, Connection, ConnectionFlags, PipeItem};
use logpipe_core::driver::ThreadedSourceDriver;
use logpipe_drivers_file::{FileAppendDestination, FileTailSource, InternalMarkSource, SourceEndpoint};
use logpipe_runtime_std::{DestinationEndpoint, DestinationRuntime};

use crate::cfg_file::{CfgDocument, ConnectionSpec, DestinationSpec, SourceSpec};
use crate::error::CliError;

pub struct PendingSource {
    pub name: String,
    pub driver: Arc<dyn ThreadedSourceDriver>,
}

pub struct BuildOutcome {
    pub configuration: Configuration,
    pub pending_sources: Vec<PendingSource>,
    pub mark_source_name: Option<String>,
    pub window_capacity: i64,
    pub mark_freq: Option<Duration>,
}

pub fn build(doc: CfgDocument) -> Result<BuildOutcome, CliError> {
    let window_capacity = doc.options.log_iw_size;
    let flush_lines = doc.options.flush_lines;
    let time_reopen = doc.options.time_reopen();
    let mark_freq = doc.options.mark_freq();
    let mut configuration = Configuration::new(doc.options);

    let mut pending_sources = Vec::new();
    let mut mark_source_name = None;
    for source in doc.sources {
        match source {
            SourceSpec::FileTail { name, path, poll_interval_ms, max_line_bytes, resume_from } => {
                configuration.add_source(name.as_str(), Box::new(SourceEndpoint::default()));
                let mut driver = FileTailSource::new(path, Duration::from_millis(poll_interval_ms));
                if let Some(max) = max_line_bytes {
                    driver = driver.with_max_line_bytes(max);
                }
                if let Some(offset) = resume_from {
                    driver = driver.resume_from(offset);
                }
                pending_sources.push(PendingSource { name, driver: Arc::new(driver) });
            }
            SourceSpec::Mark { name } => {
                if mark_source_name.is_some() {
                    return Err(CliError::DuplicateMarkSource);
                }
                configuration.add_source(name.as_str(), Box::new(InternalMarkSource::new()));
                mark_source_name = Some(name);
            }
        }
    }

    for destination in doc.destinations {
        match destination {
            DestinationSpec::FileAppend { name, path, queue_depth } => {
                let driver = Arc::new(FileAppendDestination::new(path));
                let runtime = DestinationRuntime::spawn(name.clone(), driver, queue_depth, flush_lines, time_reopen);
                configuration.add_destination(name.as_str(), Box::new(DestinationEndpoint::new(runtime)));
            }
        }
    }

    for ConnectionSpec { sources, destinations, flags } in doc.connections {
        let flags = ConnectionFlags::from_names(flags.iter().map(String::as_str));
        for source_name in &sources {
            let mut items = vec![PipeItem::SourceRef(source_name.clone())];
            items.extend(destinations.iter().cloned().map(PipeItem::DestinationRef));
            configuration.add_connection(Connection::new(items, flags));
        }
    }

    Ok(BuildOutcome { configuration, pending_sources, mark_source_name, window_capacity, mark_freq })
}
