//! Declarative "log statement" data types.
//!
//! These are the `PipelineCompiler`'s input shape: a [`Configuration`](crate::compiler::Configuration)
//! holds a list of [`Connection`]s, each an ordered chain of [`PipeItem`]
//! endpoints plus a flag set, entirely independent of how that
//! configuration was produced (TOML, a hand-built value in a test, or
//! otherwise) — the grammar that produces it is a separate concern.

/// A compile-time endpoint descriptor.
#[derive(Debug, Clone)]
pub enum PipeItem {
    SourceRef(String),
    FilterRef(String),
    ParserRef(String),
    RewriteRef(String),
    DestinationRef(String),
    InlinePipe(Box<Connection>),
}

/// Connection-level flags. Both spellings of flow-control are accepted
/// when parsing from text, to preserve both for backward compatibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionFlags {
    pub catchall: bool,
    pub fallback: bool,
    pub final_: bool,
    pub flow_control: bool,
}

impl ConnectionFlags {
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut flags = Self::default();
        for name in names {
            match name {
                "catch-all" | "catchall" | "catch_all" => flags.catchall = true,
                "fallback" => flags.fallback = true,
                "final" => flags.final_ = true,
                "flow-control" | "flow_control" => flags.flow_control = true,
                other => tracing::warn!(flag = other, "unrecognized connection flag, ignoring"),
            }
        }
        flags
    }
}

/// A user-declared path through the graph: an ordered chain of endpoints
/// plus a flag set.
#[derive(Debug, Clone, Default)]
pub struct Connection {
    pub items: Vec<PipeItem>,
    pub flags: ConnectionFlags,
}

impl Connection {
    pub fn new(items: Vec<PipeItem>, flags: ConnectionFlags) -> Self {
        Self { items, flags }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_flow_control_spellings_are_accepted() {
        assert!(ConnectionFlags::from_names(["flow-control"]).flow_control);
        assert!(ConnectionFlags::from_names(["flow_control"]).flow_control);
    }

    #[test]
    fn unrecognized_flag_is_ignored_not_rejected() {
        let flags = ConnectionFlags::from_names(["final", "bogus"]);
        assert!(flags.final_);
        assert!(!flags.catchall);
    }
}
