//! The TOML document this binary accepts. Flat, name-keyed tables rather
//! than a nested block syntax — just enough structure to build a
//! `Configuration` and drive `logpipe-core` end to end.

use std::path::PathBuf;

use logpipe_core::compiler::GlobalOptions;

#[derive(Debug, serde::Deserialize)]
pub struct CfgDocument {
    #[serde(default)]
    pub options: GlobalOptions,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
    #[serde(default)]
    pub destinations: Vec<DestinationSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

impl CfgDocument {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SourceSpec {
    /// Tails a growing file, one `Message` per line (`logpipe_drivers_file::FileTailSource`).
    FileTail {
        name: String,
        path: PathBuf,
        #[serde(default = "default_poll_interval_ms")]
        poll_interval_ms: u64,
        #[serde(default)]
        max_line_bytes: Option<usize>,
        #[serde(default)]
        resume_from: Option<u64>,
    },
    /// The internal mark source; at most one per document.
    Mark { name: String },
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DestinationSpec {
    /// Appends each message's `MESSAGE` field to a file (`logpipe_drivers_file::FileAppendDestination`).
    FileAppend {
        name: String,
        path: PathBuf,
        #[serde(default = "default_queue_depth")]
        queue_depth: usize,
    },
}

#[derive(Debug, serde::Deserialize)]
pub struct ConnectionSpec {
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    #[serde(default)]
    pub flags: Vec<String>,
}

fn default_poll_interval_ms() -> u64 {
    200
}

fn default_queue_depth() -> usize {
    64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_document() {
        let doc = CfgDocument::from_toml_str(
            r#"
            [options]
            mark_freq_secs = 5

            [[sources]]
            kind = "file-tail"
            name = "app"
            path = "/var/log/app.log"

            [[destinations]]
            kind = "file-append"
            name = "out"
            path = "/var/log/out.log"

            [[connections]]
            sources = ["app"]
            destinations = ["out"]
            flags = ["final"]
            "#,
        )
        .unwrap();

        assert_eq!(doc.options.mark_freq_secs, 5);
        assert_eq!(doc.sources.len(), 1);
        assert_eq!(doc.destinations.len(), 1);
        assert_eq!(doc.connections.len(), 1);
        assert_eq!(doc.connections[0].flags, vec!["final".to_string()]);
    }

    #[test]
    fn options_table_is_optional() {
        let doc = CfgDocument::from_toml_str("").unwrap();
        assert_eq!(doc.options.mark_freq_secs, GlobalOptions::default().mark_freq_secs);
        assert!(doc.sources.is_empty());
    }
}
