//! Grammar files for blockscan.
//!
//! A grammar file is TOML. The root table holds the root block's fields plus
//! `debug` and an `[options]` table; nested blocks live under `blocks`, in the
//! order they appear in the file:
//!
//! ```toml
//! split = ","
//! handle = "trim"
//!
//! [options]
//! unterminated = "close"
//!
//! [blocks.quotes]
//! start = '"'
//! stop = '"'
//! escaped_stop = '\"'
//! replace_escapes = true
//!
//! [blocks.list]
//! start = "("
//! stop = ")"
//! split = { pattern = " *; *" }
//! blocks.list = { ref = "/blocks/list" }
//! ```

pub mod handlers;

use std::path::{Path, PathBuf};

use blockscan_engine::grammar::builder::RuleDef;
use blockscan_engine::{
    BlockDef, Grammar, GrammarError, LogTrace, ScanOptions, StoreSplit, UnterminatedPolicy,
};
use serde::Deserialize;
use thiserror::Error;

pub use handlers::HandlerRegistry;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read grammar file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse grammar file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse grammar: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Invalid block definition at {block}: {source}")]
    InvalidBlock {
        block: String,
        source: toml::de::Error,
    },

    #[error("Unknown handler `{name}` for block {block}")]
    UnknownHandler { block: String, name: String },

    #[error("Invalid debug level {level}, expected true, false or 1")]
    InvalidDebugLevel { level: i64 },

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// A split or strip rule as written in the file: a literal string or
/// `{ pattern = "…" }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RuleEntry {
    Literal(String),
    Pattern { pattern: String },
}

impl From<RuleEntry> for RuleDef {
    fn from(entry: RuleEntry) -> Self {
        match entry {
            RuleEntry::Literal(lit) => RuleDef::Literal(lit),
            RuleEntry::Pattern { pattern } => RuleDef::Pattern(pattern),
        }
    }
}

/// `store_split = true` keeps the whole split match, an integer keeps that
/// capture group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoreSplitEntry {
    Flag(bool),
    Group(usize),
}

impl Default for StoreSplitEntry {
    fn default() -> Self {
        StoreSplitEntry::Flag(false)
    }
}

impl From<StoreSplitEntry> for StoreSplit {
    fn from(entry: StoreSplitEntry) -> Self {
        match entry {
            StoreSplitEntry::Flag(false) => StoreSplit::No,
            StoreSplitEntry::Flag(true) => StoreSplit::Whole,
            StoreSplitEntry::Group(n) => StoreSplit::Group(n),
        }
    }
}

/// `debug = true` traces block structure; `debug = 1` also traces every
/// character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DebugEntry {
    Flag(bool),
    Level(i64),
}

/// A reference to another block, by its path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefEntry {
    #[serde(rename = "ref")]
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BlockItem {
    Ref(RefEntry),
    Inline(BlockEntry),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlockEntry {
    pub start: Option<String>,
    pub stop: Option<String>,
    pub escaped_start: Option<String>,
    pub escaped_stop: Option<String>,
    #[serde(default)]
    pub keep_start_stop: bool,
    #[serde(default)]
    pub replace_escapes: bool,
    pub split: Option<RuleEntry>,
    #[serde(default)]
    pub store_split: StoreSplitEntry,
    #[serde(default)]
    pub strip: Vec<RuleEntry>,
    #[serde(default)]
    pub ignore_empty: bool,
    /// Nested blocks, each a [`BlockItem`]. Kept as a raw table so the
    /// file's declaration order survives. `blocks = { ref = "…" }` shares
    /// another block's nested blocks instead.
    #[serde(default)]
    pub blocks: toml::Table,
    pub handle: Option<String>,
    #[serde(default)]
    pub reparse: bool,
    #[serde(default)]
    pub handle_all: bool,
}

impl BlockEntry {
    fn into_def<C>(self, path: &str, registry: &HandlerRegistry<C>) -> Result<BlockDef<C>, ConfigError> {
        let mut def = BlockDef::new()
            .keep_start_stop(self.keep_start_stop)
            .replace_escapes(self.replace_escapes)
            .store_split(self.store_split.into())
            .ignore_empty(self.ignore_empty)
            .reparse(self.reparse)
            .handle_all(self.handle_all);

        if let Some(start) = self.start {
            def = def.start(start);
        }
        if let Some(stop) = self.stop {
            def = def.stop(stop);
        }
        if let Some(escaped) = self.escaped_start {
            def = def.escaped_start(escaped);
        }
        if let Some(escaped) = self.escaped_stop {
            def = def.escaped_stop(escaped);
        }
        if let Some(split) = self.split {
            def = def.split_rule(split.into());
        }
        for rule in self.strip {
            def = def.strip_rule(rule.into());
        }

        if let Some(name) = self.handle {
            let handle = registry.get(&name).ok_or_else(|| ConfigError::UnknownHandler {
                block: path.to_string(),
                name,
            })?;
            def = def.handler(handle);
        }

        let mut blocks = self.blocks;
        if blocks.len() == 1
            && let Some(target) = blocks.get("ref").and_then(toml::Value::as_str)
        {
            def = def.blocks_from(target);
            blocks.clear();
        }

        for (name, value) in blocks {
            let child_path = format!("{}/blocks/{name}", path.trim_end_matches('/'));
            let item = value
                .try_into::<BlockItem>()
                .map_err(|source| ConfigError::InvalidBlock {
                    block: child_path.clone(),
                    source,
                })?;
            def = match item {
                BlockItem::Ref(r) => def.block_ref(name, r.target),
                BlockItem::Inline(entry) => {
                    let child = entry.into_def(&child_path, registry)?;
                    def.block(name, child)
                }
            };
        }

        Ok(def)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OptionsEntry {
    pub max_reparse_depth: Option<usize>,
    pub unterminated: Option<UnterminatedPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrammarFile {
    pub debug: Option<DebugEntry>,
    #[serde(default)]
    pub options: OptionsEntry,
    #[serde(flatten)]
    pub root: BlockEntry,
}

impl GrammarFile {
    /// Parses and validates a grammar file's contents.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: GrammarFile = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let file: GrammarFile =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        file.validate()?;

        Ok(Some(file))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::default_path())
    }

    pub fn default_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/blockscan");
        PathBuf::from(config_dir.as_ref()).join("grammar.toml")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.debug {
            Some(DebugEntry::Level(level)) if level != 1 => {
                Err(ConfigError::InvalidDebugLevel { level })
            }
            _ => Ok(()),
        }
    }

    pub fn scan_options(&self) -> ScanOptions {
        let defaults = ScanOptions::default();
        ScanOptions {
            max_reparse_depth: self
                .options
                .max_reparse_depth
                .unwrap_or(defaults.max_reparse_depth),
            unterminated: self.options.unterminated.unwrap_or(defaults.unterminated),
        }
    }

    /// The trace sink requested by `debug`, if any.
    pub fn trace(&self) -> Option<LogTrace> {
        match self.debug? {
            DebugEntry::Flag(false) => None,
            DebugEntry::Flag(true) => Some(LogTrace::new(false)),
            DebugEntry::Level(_) => Some(LogTrace::new(true)),
        }
    }

    /// Builds the grammar, looking up `handle` names in `registry`.
    pub fn into_grammar<C>(self, registry: &HandlerRegistry<C>) -> Result<Grammar<C>, ConfigError> {
        let def = self.root.into_def("/", registry)?;
        Ok(def.resolve()?)
    }
}
