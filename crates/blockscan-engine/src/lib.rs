//! # blockscan
//!
//! A grammar-driven tokenizer for small embedded languages: quoted values,
//! tag syntax, template expressions and the like.
//!
//! A [`Grammar`] describes nested blocks with start/stop delimiters, escape
//! sequences, split and strip rules, and optional handlers. [`scan`] walks a
//! string once against that grammar and returns a [`Part`]: a single string,
//! or a tree of strings when the input was split or blocks kept their
//! delimiters.
//!
//! ```
//! use blockscan_engine::{BlockDef, Part, scan};
//!
//! let grammar = BlockDef::new()
//!     .split(",")
//!     .block("quotes", BlockDef::delimited("\"", "\""))
//!     .resolve()?;
//!
//! let parts = scan(r#"val1,"val,2",val3"#, &grammar)?;
//! assert_eq!(parts, Part::Group(vec!["val1".into(), "val,2".into(), "val3".into()]));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod grammar;
pub mod scan;
pub mod trace;
pub mod value;

pub use error::ScanError;
pub use grammar::{BlockDef, BlockId, BlockSpec, Grammar, GrammarError, Handler, StoreSplit};
pub use scan::options::{ScanOptions, UnterminatedPolicy};
pub use scan::{Scanner, scan, scan_with_context};
pub use trace::{LogTrace, Recorder, TraceEvent, TraceSink};
pub use value::Part;
