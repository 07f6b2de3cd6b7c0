//! # Grammar Model
//!
//! The resolved, immutable grammar consumed by the scan engine.
//!
//! ## Architecture
//!
//! A grammar is an arena of [`BlockSpec`]s addressed by [`BlockId`]. Nested
//! blocks are stored as `(name, BlockId)` pairs, so self- and mutually
//! recursive grammars are plain index lookups rather than object cycles.
//!
//! Grammars are produced once by [`BlockDef::resolve`](builder::BlockDef::resolve),
//! which resolves references, anchors patterns and validates delimiters. The
//! scan engine never mutates or re-validates a grammar, so one grammar can be
//! shared across threads and reused with different handler contexts.
//!
//! ## Modules
//!
//! - **`builder`**: `BlockDef` definitions and the resolution pass
//! - **`rule`**: split/strip rules and anchored patterns

pub mod builder;
pub mod rule;

use std::fmt;
use std::sync::Arc;

use crate::value::Part;

pub use builder::{BlockDef, GrammarError};
pub use rule::{AnchoredPattern, Rule, RuleMatch};

/// Function invoked with a block's parts (or a root fragment) and the
/// caller's context. Its error aborts the scan.
pub type Handler<C> = Arc<dyn Fn(Part, &mut C) -> anyhow::Result<Part> + Send + Sync>;

/// Index of a block spec inside its [`Grammar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub(crate) usize);

/// Which part of a split match to keep as its own element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreSplit {
    #[default]
    No,
    /// The whole matched split text.
    Whole,
    /// Capture group `n` of a pattern split, falling back to the whole
    /// match when the group does not exist or did not participate.
    Group(usize),
}

/// A resolved block rule.
pub struct BlockSpec<C = ()> {
    pub(crate) path: String,
    pub start: Option<String>,
    pub stop: Option<String>,
    pub escaped_start: Option<String>,
    pub escaped_stop: Option<String>,
    pub keep_start_stop: bool,
    pub replace_escapes: bool,
    pub split: Option<Rule>,
    pub store_split: StoreSplit,
    pub strip: Vec<Rule>,
    pub ignore_empty: bool,
    pub(crate) blocks: Vec<(String, BlockId)>,
    pub handle: Option<Handler<C>>,
    pub reparse: bool,
    pub handle_all: bool,
}

impl<C> BlockSpec<C> {
    /// Definition path of this spec, `/` for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Nested blocks in declaration order.
    pub fn blocks(&self) -> impl Iterator<Item = (&str, BlockId)> {
        self.blocks.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Whether closing this block may feed its handler output back in.
    pub fn reparses(&self) -> bool {
        self.reparse && self.handle.is_some()
    }
}

impl<C> fmt::Debug for BlockSpec<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockSpec")
            .field("path", &self.path)
            .field("start", &self.start)
            .field("stop", &self.stop)
            .field("escaped_start", &self.escaped_start)
            .field("escaped_stop", &self.escaped_stop)
            .field("keep_start_stop", &self.keep_start_stop)
            .field("replace_escapes", &self.replace_escapes)
            .field("split", &self.split)
            .field("store_split", &self.store_split)
            .field("strip", &self.strip)
            .field("ignore_empty", &self.ignore_empty)
            .field("blocks", &self.blocks)
            .field("handle", &self.handle.is_some())
            .field("reparse", &self.reparse)
            .field("handle_all", &self.handle_all)
            .finish()
    }
}

/// A resolved grammar: the root spec plus every block reachable from it.
pub struct Grammar<C = ()> {
    pub(crate) specs: Vec<BlockSpec<C>>,
}

impl<C> Grammar<C> {
    /// The root spec is always the first arena entry.
    pub const ROOT: BlockId = BlockId(0);

    pub fn root(&self) -> &BlockSpec<C> {
        self.spec(Self::ROOT)
    }

    pub fn spec(&self, id: BlockId) -> &BlockSpec<C> {
        &self.specs[id.0]
    }

    /// Number of distinct specs, including the root.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<C> fmt::Debug for Grammar<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.specs.iter()).finish()
    }
}
