//! Grammar definitions and the resolution pass.
//!
//! [`BlockDef`] is the unresolved, builder-style form of a grammar. Nested
//! blocks are either inline definitions or references to another definition
//! by path (`/blocks/expression`, `/blocks/tag/blocks/quotes`, ...), which is
//! how recursive grammars are written. A block can also take over another
//! block's whole nested set with [`BlockDef::blocks_from`].
//!
//! [`BlockDef::resolve`] runs once, before any scanning: it assigns every
//! definition an arena slot, resolves references to slots, anchors patterns
//! and validates delimiters.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{BlockId, BlockSpec, Grammar, Handler, StoreSplit, rule::AnchoredPattern, rule::Rule};
use crate::value::Part;

const ROOT_PATH: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("unresolved block reference `{path}` in {from}")]
    UnresolvedReference { path: String, from: String },
    #[error("block reference `{path}` refers back to itself")]
    ReferenceCycle { path: String },
    #[error("invalid pattern `{pattern}` in {block}: {source}")]
    InvalidPattern {
        block: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("block {block} has no start delimiter")]
    MissingStart { block: String },
    #[error("empty `{field}` in {block}")]
    EmptyDelimiter { block: String, field: &'static str },
    #[error("the root block cannot have a `{field}` delimiter")]
    RootDelimiter { field: &'static str },
}

/// An unresolved split or strip rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleDef {
    Literal(String),
    /// A regular expression; anchored to the cursor during resolution.
    Pattern(String),
}

enum Nested<C> {
    Inline(BlockDef<C>),
    Ref(String),
}

/// An unresolved block definition.
///
/// The root of a grammar is also a `BlockDef`, one without delimiters.
pub struct BlockDef<C = ()> {
    start: Option<String>,
    stop: Option<String>,
    escaped_start: Option<String>,
    escaped_stop: Option<String>,
    keep_start_stop: bool,
    replace_escapes: bool,
    split: Option<RuleDef>,
    store_split: StoreSplit,
    strip: Vec<RuleDef>,
    ignore_empty: bool,
    blocks: Vec<(String, Nested<C>)>,
    shared_blocks: Option<String>,
    handle: Option<Handler<C>>,
    reparse: bool,
    handle_all: bool,
}

impl<C> Default for BlockDef<C> {
    fn default() -> Self {
        Self {
            start: None,
            stop: None,
            escaped_start: None,
            escaped_stop: None,
            keep_start_stop: false,
            replace_escapes: false,
            split: None,
            store_split: StoreSplit::No,
            strip: Vec::new(),
            ignore_empty: false,
            blocks: Vec::new(),
            shared_blocks: None,
            handle: None,
            reparse: false,
            handle_all: false,
        }
    }
}

impl<C> BlockDef<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A block entered by `start` and left by `stop`.
    pub fn delimited(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self::new().start(start).stop(stop)
    }

    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn stop(mut self, stop: impl Into<String>) -> Self {
        self.stop = Some(stop.into());
        self
    }

    pub fn escaped_start(mut self, escaped: impl Into<String>) -> Self {
        self.escaped_start = Some(escaped.into());
        self
    }

    pub fn escaped_stop(mut self, escaped: impl Into<String>) -> Self {
        self.escaped_stop = Some(escaped.into());
        self
    }

    pub fn keep_start_stop(mut self, keep: bool) -> Self {
        self.keep_start_stop = keep;
        self
    }

    pub fn replace_escapes(mut self, replace: bool) -> Self {
        self.replace_escapes = replace;
        self
    }

    pub fn split(mut self, split: impl Into<String>) -> Self {
        self.split = Some(RuleDef::Literal(split.into()));
        self
    }

    pub fn split_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.split = Some(RuleDef::Pattern(pattern.into()));
        self
    }

    pub fn split_rule(mut self, rule: RuleDef) -> Self {
        self.split = Some(rule);
        self
    }

    pub fn store_split(mut self, store: StoreSplit) -> Self {
        self.store_split = store;
        self
    }

    pub fn strip(mut self, strip: impl Into<String>) -> Self {
        self.strip.push(RuleDef::Literal(strip.into()));
        self
    }

    pub fn strip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.strip.push(RuleDef::Pattern(pattern.into()));
        self
    }

    pub fn strip_rule(mut self, rule: RuleDef) -> Self {
        self.strip.push(rule);
        self
    }

    pub fn ignore_empty(mut self, ignore: bool) -> Self {
        self.ignore_empty = ignore;
        self
    }

    /// Adds a nested block. Re-using a name replaces the earlier definition
    /// but keeps its position in the declaration order.
    pub fn block(self, name: impl Into<String>, def: BlockDef<C>) -> Self {
        self.nested(name.into(), Nested::Inline(def))
    }

    /// Adds a nested block that refers to another definition by path.
    pub fn block_ref(self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.nested(name.into(), Nested::Ref(path.into()))
    }

    /// Uses the nested blocks of the block at `path`, written either as the
    /// block's path or followed by `/blocks`. Blocks added with [`block`] or
    /// [`block_ref`] are appended, replacing shared ones of the same name.
    ///
    /// [`block`]: BlockDef::block
    /// [`block_ref`]: BlockDef::block_ref
    pub fn blocks_from(mut self, path: impl Into<String>) -> Self {
        self.shared_blocks = Some(path.into());
        self
    }

    fn nested(mut self, name: String, entry: Nested<C>) -> Self {
        match self.blocks.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.blocks.push((name, entry)),
        }
        self
    }

    pub fn handle<F>(mut self, handle: F) -> Self
    where
        F: Fn(Part, &mut C) -> anyhow::Result<Part> + Send + Sync + 'static,
    {
        self.handle = Some(Arc::new(handle));
        self
    }

    pub fn handler(mut self, handle: Handler<C>) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn reparse(mut self, reparse: bool) -> Self {
        self.reparse = reparse;
        self
    }

    pub fn handle_all(mut self, handle_all: bool) -> Self {
        self.handle_all = handle_all;
        self
    }

    /// Resolves this definition, used as the grammar root, into a [`Grammar`].
    pub fn resolve(self) -> Result<Grammar<C>, GrammarError> {
        for (field, value) in [("start", &self.start), ("stop", &self.stop)] {
            if value.is_some() {
                return Err(GrammarError::RootDelimiter { field });
            }
        }

        let mut table = Table::default();
        table.flatten(self, ROOT_PATH.to_string());

        let nested = (0..table.pending.len())
            .map(|slot| table.nested_blocks(slot, &mut HashSet::new()))
            .collect::<Result<Vec<_>, _>>()?;
        let pending = std::mem::take(&mut table.pending);
        let specs = pending
            .into_iter()
            .zip(nested)
            .map(|(p, blocks)| build(p, blocks))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Grammar { specs })
    }
}

enum Target {
    Slot(usize),
    Ref(String),
}

struct Pending<C> {
    path: String,
    def: BlockDef<C>,
    blocks: Vec<(String, Target)>,
    shared: Option<String>,
}

struct Table<C> {
    pending: Vec<Pending<C>>,
    slots: HashMap<String, usize>,
    aliases: HashMap<String, String>,
}

impl<C> Default for Table<C> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            slots: HashMap::new(),
            aliases: HashMap::new(),
        }
    }
}

fn child_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        format!("/blocks/{name}")
    } else {
        format!("{parent}/blocks/{name}")
    }
}

impl<C> Table<C> {
    /// Assigns slots in pre-order, so the root lands in slot 0.
    fn flatten(&mut self, mut def: BlockDef<C>, path: String) -> usize {
        let slot = self.pending.len();
        let nested = std::mem::take(&mut def.blocks);
        let shared = def.shared_blocks.take();
        self.slots.insert(path.clone(), slot);
        self.pending.push(Pending {
            path: path.clone(),
            def,
            blocks: Vec::new(),
            shared,
        });

        let mut blocks = Vec::with_capacity(nested.len());
        for (name, entry) in nested {
            let at = child_path(&path, &name);
            let target = match entry {
                Nested::Inline(child) => Target::Slot(self.flatten(child, at)),
                Nested::Ref(to) => {
                    self.aliases.insert(at, to.clone());
                    Target::Ref(to)
                }
            };
            blocks.push((name, target));
        }
        self.pending[slot].blocks = blocks;
        slot
    }

    fn lookup(&self, path: &str, from: &str) -> Result<usize, GrammarError> {
        let mut seen = HashSet::new();
        let mut current = path;
        loop {
            if let Some(slot) = self.slots.get(current) {
                return Ok(*slot);
            }
            let Some(next) = self.aliases.get(current) else {
                return Err(GrammarError::UnresolvedReference {
                    path: path.to_string(),
                    from: from.to_string(),
                });
            };
            if !seen.insert(current) {
                return Err(GrammarError::ReferenceCycle {
                    path: path.to_string(),
                });
            }
            current = next.as_str();
        }
    }

    /// The nested blocks of `slot`: shared ones first, then its own.
    fn nested_blocks(&self, slot: usize, seen: &mut HashSet<usize>) -> Result<Vec<(String, BlockId)>, GrammarError> {
        let p = &self.pending[slot];
        let mut blocks = Vec::new();
        if let Some(to) = &p.shared {
            let target = match to.strip_suffix("/blocks") {
                Some("") => ROOT_PATH,
                Some(owner) => owner,
                None => to.as_str(),
            };
            let from = self.lookup(target, &p.path)?;
            if !seen.insert(slot) {
                return Err(GrammarError::ReferenceCycle { path: to.clone() });
            }
            blocks = self.nested_blocks(from, seen)?;
        }

        for (name, target) in &p.blocks {
            let id = match target {
                Target::Slot(slot) => BlockId(*slot),
                Target::Ref(to) => BlockId(self.lookup(to, &p.path)?),
            };
            match blocks.iter_mut().find(|(n, _)| *n == *name) {
                Some(entry) => entry.1 = id,
                None => blocks.push((name.clone(), id)),
            }
        }
        Ok(blocks)
    }
}

fn build<C>(p: Pending<C>, blocks: Vec<(String, BlockId)>) -> Result<BlockSpec<C>, GrammarError> {
    let Pending { path, def, .. } = p;
    let is_root = path == ROOT_PATH;

    let delimiters = [
        ("start", &def.start),
        ("stop", &def.stop),
        ("escaped_start", &def.escaped_start),
        ("escaped_stop", &def.escaped_stop),
    ];
    for (field, value) in delimiters {
        if value.as_deref() == Some("") {
            return Err(GrammarError::EmptyDelimiter { block: path, field });
        }
    }
    if !is_root && def.start.is_none() {
        return Err(GrammarError::MissingStart { block: path });
    }

    let split = def
        .split
        .map(|r| compile(r, &path, "split"))
        .transpose()?;
    let strip = def
        .strip
        .into_iter()
        .map(|r| compile(r, &path, "strip"))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BlockSpec {
        path,
        start: def.start,
        stop: def.stop,
        escaped_start: def.escaped_start,
        escaped_stop: def.escaped_stop,
        keep_start_stop: def.keep_start_stop,
        replace_escapes: def.replace_escapes,
        split,
        store_split: def.store_split,
        strip,
        ignore_empty: def.ignore_empty,
        blocks,
        handle: def.handle,
        reparse: def.reparse,
        handle_all: def.handle_all,
    })
}

fn compile(rule: RuleDef, block: &str, field: &'static str) -> Result<Rule, GrammarError> {
    match rule {
        RuleDef::Literal(lit) if lit.is_empty() => Err(GrammarError::EmptyDelimiter {
            block: block.to_string(),
            field,
        }),
        RuleDef::Literal(lit) => Ok(Rule::Literal(lit)),
        RuleDef::Pattern(pattern) => AnchoredPattern::anchor(&pattern)
            .map(Rule::Pattern)
            .map_err(|source| GrammarError::InvalidPattern {
                block: block.to_string(),
                pattern,
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    type Def = BlockDef<()>;

    #[test]
    fn root_is_slot_zero_and_children_follow_in_order() {
        let grammar = Def::new()
            .block("a", Def::delimited("<", ">"))
            .block("b", Def::delimited("{", "}").block("c", Def::delimited("(", ")")))
            .resolve()
            .unwrap();

        assert_eq!(grammar.len(), 4);
        assert_eq!(grammar.root().path(), "/");
        let names: Vec<_> = grammar.root().blocks().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);

        let (_, b) = grammar.root().blocks().nth(1).unwrap();
        let (_, c) = grammar.spec(b).blocks().next().unwrap();
        assert_eq!(grammar.spec(c).path(), "/blocks/b/blocks/c");
    }

    #[test]
    fn self_reference_resolves_to_same_slot() {
        let grammar = Def::new()
            .block(
                "paren",
                Def::delimited("(", ")").block_ref("paren", "/blocks/paren"),
            )
            .resolve()
            .unwrap();

        let (_, paren) = grammar.root().blocks().next().unwrap();
        let (_, inner) = grammar.spec(paren).blocks().next().unwrap();
        assert_eq!(paren, inner);
        assert_eq!(grammar.len(), 2);
    }

    #[test]
    fn reference_through_another_reference() {
        let grammar = Def::new()
            .block("expr", Def::delimited("{{", "}}"))
            .block("tag", Def::delimited("<", ">").block_ref("expr", "/blocks/expr"))
            .block("quote", Def::delimited("'", "'").block_ref("expr", "/blocks/tag/blocks/expr"))
            .resolve()
            .unwrap();

        let ids: Vec<_> = grammar.root().blocks().map(|(_, id)| id).collect();
        let (_, via) = grammar.spec(ids[2]).blocks().next().unwrap();
        assert_eq!(via, ids[0]);
    }

    #[test]
    fn blocks_can_be_shared_by_path() {
        let grammar = Def::new()
            .block(
                "stop_tag",
                Def::delimited("</", ">")
                    .block("quotes", Def::delimited("'", "'"))
                    .block("expr", Def::delimited("{{", "}}")),
            )
            .block(
                "start_tag",
                Def::delimited("<", ">")
                    .blocks_from("/blocks/stop_tag/blocks")
                    .block("expr", Def::delimited("${", "}")),
            )
            .resolve()
            .unwrap();

        let ids: Vec<_> = grammar.root().blocks().map(|(_, id)| id).collect();
        let shared: Vec<_> = grammar.spec(ids[0]).blocks().collect();
        let start_tag: Vec<_> = grammar.spec(ids[1]).blocks().collect();
        assert_eq!(start_tag[0], shared[0]);
        assert_eq!(start_tag[1].0, "expr");
        assert_eq!(grammar.spec(start_tag[1].1).start.as_deref(), Some("${"));
    }

    #[test]
    fn sharing_blocks_with_itself_is_a_cycle() {
        let err = Def::new()
            .block("a", Def::delimited("<", ">").blocks_from("/blocks/b"))
            .block("b", Def::delimited("(", ")").blocks_from("/blocks/a/blocks"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GrammarError::ReferenceCycle { .. }));
    }

    #[test]
    fn unresolved_reference_names_path_and_origin() {
        let err = Def::new()
            .block("tag", Def::delimited("<", ">").block_ref("expr", "/blocks/missing"))
            .resolve()
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "unresolved block reference `/blocks/missing` in /blocks/tag"
        );
    }

    #[test]
    fn reference_cycle_is_reported() {
        let err = Def::new()
            .block_ref("a", "/blocks/b")
            .block_ref("b", "/blocks/a")
            .resolve()
            .unwrap_err();

        assert!(matches!(err, GrammarError::ReferenceCycle { .. }));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = Def::new().split_pattern("(").resolve().unwrap_err();
        assert!(matches!(
            err,
            GrammarError::InvalidPattern { ref block, .. } if block == "/"
        ));
    }

    #[test]
    fn nested_block_needs_start() {
        let err = Def::new()
            .block("bad", Def::new().stop(">"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GrammarError::MissingStart { ref block } if block == "/blocks/bad"));
    }

    #[test]
    fn empty_delimiters_are_rejected() {
        let err = Def::new()
            .block("bad", Def::delimited("", ">"))
            .resolve()
            .unwrap_err();
        assert!(matches!(err, GrammarError::EmptyDelimiter { field: "start", .. }));

        let err = Def::new().split("").resolve().unwrap_err();
        assert!(matches!(err, GrammarError::EmptyDelimiter { field: "split", .. }));
    }

    #[test]
    fn root_cannot_be_delimited() {
        let err = Def::new().stop(">").resolve().unwrap_err();
        assert!(matches!(err, GrammarError::RootDelimiter { field: "stop" }));
    }

    #[test]
    fn reusing_a_name_keeps_declaration_position() {
        let grammar = Def::new()
            .block("a", Def::delimited("<", ">"))
            .block("b", Def::delimited("{", "}"))
            .block("a", Def::delimited("[", "]"))
            .resolve()
            .unwrap();

        let blocks: Vec<_> = grammar
            .root()
            .blocks()
            .map(|(n, id)| (n, grammar.spec(id).start.clone().unwrap()))
            .collect();
        assert_eq!(blocks, [("a", "[".to_string()), ("b", "{".to_string())]);
    }
}
