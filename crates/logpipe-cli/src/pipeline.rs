//! Wires a parsed [`CfgDocument`] all the way to a runnable [`MainLoop`]:
//! compile, spawn every pending source's `SourceRuntime` against the
//! `PipeId` the compiler assigned it, and hand back both the loop and the
//! `Arc<Center>` it shares with a [`ConfigHandle`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use logpipe_core::compiler::PipelineCompiler;
use logpipe_core::message::Window;
use logpipe_core::pipe::PipeId;
use logpipe_runtime_std::{MainLoop, SourceRuntime};

use crate::build::{self, BuildOutcome};
use crate::cfg_file::CfgDocument;
use crate::error::CliError;

pub struct LoadedPipeline {
    pub center: Arc<logpipe_core::compiler::Center>,
    pub main_loop: MainLoop,
}

pub fn load_from_path(path: &Path) -> Result<LoadedPipeline, CliError> {
    let text = fs::read_to_string(path).map_err(|source| CliError::ReadConfig { path: path.to_path_buf(), source })?;
    let doc = CfgDocument::from_toml_str(&text).map_err(|source| CliError::ParseConfig { path: path.to_path_buf(), source })?;
    load_from_document(doc)
}

fn load_from_document(doc: CfgDocument) -> Result<LoadedPipeline, CliError> {
    let BuildOutcome { configuration, pending_sources, mark_source_name, window_capacity, mark_freq } = build::build(doc)?;

    let compiled = PipelineCompiler::compile(configuration)?;
    let center = Arc::new(compiled.center);

    let mut sources: HashMap<PipeId, SourceRuntime> = HashMap::new();
    for source in pending_sources {
        let window = Window::new(window_capacity);
        let pipe_id = compiled.sources[&source.name];
        sources.insert(pipe_id, SourceRuntime::spawn(source.name, source.driver, window));
    }

    let mark_source = mark_source_name.map(|name| compiled.sources[&name]);
    let main_loop = MainLoop::new(center.clone(), sources, mark_source, mark_freq);

    Ok(LoadedPipeline { center, main_loop })
}
