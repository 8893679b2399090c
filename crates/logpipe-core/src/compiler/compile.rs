//! Turns a [`Configuration`] into an initialised [`Center`].

use std::collections::HashMap;

use crate::compiler::{Center, Configuration, Connection, PipeItem, ProcessKind, ProcessRule};
use crate::error::ConfigError;
use crate::multiplexer::Multiplexer;
use crate::pipe::{PipeFlags, PipeId};

/// Result of compiling one [`Connection`] (or the body of one, with its
/// leading `Source-ref` already consumed): the `PipeId` an enclosing
/// multiplexer should add as a hop, and whether flow control needs to
/// propagate to whatever compiled this connection as a child.
struct CompiledConnection {
    head: PipeId,
    hard_flow_control: bool,
}

/// The output of [`PipelineCompiler::compile`]: the initialised graph plus
/// the name → id maps a runtime needs to address a named source (to
/// dispatch a freshly produced message) or a named destination (for
/// diagnostics) without re-deriving them.
pub struct CompiledPipeline {
    pub center: Center,
    pub sources: HashMap<String, PipeId>,
    pub destinations: HashMap<String, PipeId>,
}

/// Stateful, single-use compiler: resolves the symbolic references in a
/// [`Configuration`]'s connections and materialises them into a linked,
/// initialised [`Center`].
pub struct PipelineCompiler {
    sources: HashMap<String, PipeId>,
    destinations: HashMap<String, PipeId>,
    filters: HashMap<String, ProcessRule>,
    parsers: HashMap<String, ProcessRule>,
    rewriters: HashMap<String, ProcessRule>,
    /// Per-source lazily-created fan-out multiplexer: created the first
    /// time any connection (or the CATCHALL scan) references that source,
    /// reused for every later one.
    source_muxes: HashMap<PipeId, PipeId>,
}

impl PipelineCompiler {
    /// Compiles `config` into an initialised, executable [`Center`]. Any
    /// error fails the whole compilation: on failure the caller simply
    /// drops the partially built `Center` — there is no partial-cleanup
    /// path, ordinary `Drop` releases everything.
    pub fn compile(config: Configuration) -> Result<CompiledPipeline, ConfigError> {
        let mut center = Center::new();

        let sources: HashMap<String, PipeId> = config
            .sources
            .into_iter()
            .map(|(name, pipe)| (name, center.push(pipe)))
            .collect();
        let destinations: HashMap<String, PipeId> = config
            .destinations
            .into_iter()
            .map(|(name, pipe)| (name, center.push(pipe)))
            .collect();

        let mut compiler = PipelineCompiler {
            sources: sources.clone(),
            destinations: destinations.clone(),
            filters: config.filters,
            parsers: config.parsers,
            rewriters: config.rewriters,
            source_muxes: HashMap::new(),
        };

        for connection in &config.connections {
            compiler.compile_connection(connection, &mut center, true)?;
        }

        center.reinit()?;
        Ok(CompiledPipeline { center, sources, destinations })
    }

    fn source_mux(&mut self, source_id: PipeId, center: &mut Center) -> PipeId {
        if let Some(&mux_id) = self.source_muxes.get(&source_id) {
            return mux_id;
        }
        let mux_id = center.push(Box::new(Multiplexer::new(PipeFlags::default())));
        center.set_pipe_next(source_id, mux_id);
        self.source_muxes.insert(source_id, mux_id);
        mux_id
    }

    /// Compiles one connection (or, when recursing into an `InlinePipe`,
    /// the nested connection). `top_level` gates whether a leading
    /// `Source-ref` is allowed at all — only a top-level connection may
    /// name a source.
    fn compile_connection(
        &mut self,
        conn: &Connection,
        center: &mut Center,
        top_level: bool,
    ) -> Result<CompiledConnection, ConfigError> {
        if conn.items.is_empty() {
            return Err(ConfigError::EmptyConnection);
        }

        let source_name = match &conn.items[0] {
            PipeItem::SourceRef(name) => {
                if conn.flags.catchall {
                    return Err(ConfigError::SourceInCatchAll);
                }
                if !top_level {
                    return Err(ConfigError::SourceNotAtTopLevel);
                }
                Some(name.as_str())
            }
            _ => None,
        };
        let body_items = if source_name.is_some() { &conn.items[1..] } else { &conn.items[..] };
        if body_items.iter().any(|item| matches!(item, PipeItem::SourceRef(_))) {
            return Err(ConfigError::SourceNotAtTopLevel);
        }
        if body_items.is_empty() {
            return Err(ConfigError::EmptyConnection);
        }

        let mut head: Option<PipeId> = None;
        let mut tail: Option<PipeId> = None;
        let mut any_clone = false;
        let mut hard_flow_control = conn.flags.flow_control;

        for item in body_items {
            let (item_head, item_tail, item_clone, item_hfc) = self.compile_item(item, center)?;
            any_clone |= item_clone;
            hard_flow_control |= item_hfc;
            match tail {
                Some(prev) => center.set_pipe_next(prev, item_head),
                None => head = Some(item_head),
            }
            tail = Some(item_tail);
        }
        let head = head.expect("body_items checked non-empty above");

        // The head of the current path receives the connection's flag bits.
        let mut flags = center.flags(head);
        flags.branch_fallback = conn.flags.fallback;
        flags.branch_final = conn.flags.final_;
        flags.clone_on_write = flags.clone_on_write || any_clone;
        flags.hard_flow_control = hard_flow_control;
        center.set_flags(head, flags);

        if let Some(name) = source_name {
            let source_id = *self
                .sources
                .get(name)
                .ok_or_else(|| ConfigError::UnresolvedReference { kind: "source", name: name.to_string() })?;
            let mux_id = self.source_mux(source_id, center);
            center.add_hop(mux_id, head);
        } else if conn.flags.catchall {
            // CATCHALL: every source declared in the configuration at
            // compile time gets a hop to this path, not just the sources
            // named in this connection (there are none — a catchall
            // connection names no source).
            let source_ids: Vec<PipeId> = self.sources.values().copied().collect();
            for source_id in source_ids {
                let mux_id = self.source_mux(source_id, center);
                center.add_hop(mux_id, head);
            }
        }

        Ok(CompiledConnection { head, hard_flow_control })
    }

    /// Compiles one endpoint. Returns `(head, tail, forces_clone,
    /// hard_flow_control)` for the node(s) it produced.
    fn compile_item(
        &mut self,
        item: &PipeItem,
        center: &mut Center,
    ) -> Result<(PipeId, PipeId, bool, bool), ConfigError> {
        match item {
            PipeItem::SourceRef(_) => unreachable!("a Source-ref is consumed by the caller before reaching here"),

            PipeItem::FilterRef(name) => {
                let rule = self
                    .filters
                    .get(name)
                    .ok_or_else(|| ConfigError::UndefinedRule { name: name.clone() })?;
                push_rule_chain(rule, center, false)
            }
            PipeItem::ParserRef(name) => {
                let rule = self
                    .parsers
                    .get(name)
                    .ok_or_else(|| ConfigError::UndefinedRule { name: name.clone() })?;
                push_rule_chain(rule, center, true)
            }
            PipeItem::RewriteRef(name) => {
                let rule = self
                    .rewriters
                    .get(name)
                    .ok_or_else(|| ConfigError::UndefinedRule { name: name.clone() })?;
                push_rule_chain(rule, center, true)
            }

            PipeItem::DestinationRef(name) => {
                // A fresh multiplexer per reference, even to the same
                // destination group: this ensures every destination site
                // has its own forwarding node.
                let dest_id = *self
                    .destinations
                    .get(name)
                    .ok_or_else(|| ConfigError::UnresolvedReference { kind: "destination", name: name.clone() })?;
                let mux_id = center.push(Box::new(Multiplexer::new(PipeFlags::default())));
                center.add_hop(mux_id, dest_id);
                Ok((mux_id, mux_id, false, false))
            }

            PipeItem::InlinePipe(inner) => {
                let compiled = self.compile_connection(inner, center, false)?;
                let mut flags = PipeFlags::default();
                flags.hard_flow_control = compiled.hard_flow_control;
                let mux_id = center.push(Box::new(Multiplexer::new(flags)));
                center.add_hop(mux_id, compiled.head);
                Ok((mux_id, mux_id, false, compiled.hard_flow_control))
            }
        }
    }
}

/// Shared by the Filter/Parser/Rewrite arms of `compile_item`: instantiate
/// the rule's template chain, push every pipe into the center, link them,
/// and apply the CLONE resolution (the stricter-vs-looser choice recorded
/// in `DESIGN.md`).
fn push_rule_chain(
    rule: &ProcessRule,
    center: &mut Center,
    force_clone: bool,
) -> Result<(PipeId, PipeId, bool, bool), ConfigError> {
    let chain = rule.instantiate();
    if chain.is_empty() {
        return Err(ConfigError::UndefinedRule { name: rule.name().to_string() });
    }

    let ids: Vec<PipeId> = chain.into_iter().map(|pipe| center.push(pipe)).collect();
    for pair in ids.windows(2) {
        center.set_pipe_next(pair[0], pair[1]);
    }

    let head = ids[0];
    let tail = *ids.last().unwrap();

    let mut head_flags = center.flags(head);
    // Parser/Rewrite always mutate, so they always force CLONE. Filter only
    // inherits whatever the chain's own head already carries — it never
    // forces CLONE on its own (the stricter resolution: see DESIGN.md).
    debug_assert!(rule.kind() != ProcessKind::Filter || !force_clone);
    head_flags.clone_on_write = force_clone || head_flags.clone_on_write;
    center.set_flags(head, head_flags);

    Ok((head, tail, head_flags.clone_on_write, head_flags.hard_flow_control))
}
