use serde::Deserialize;

/// What to do with blocks that are still open when the input runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnterminatedPolicy {
    /// Fail with [`ScanError::Unterminated`](crate::ScanError::Unterminated).
    #[default]
    Error,
    /// Close each open block as if its stop delimiter had been found.
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Maximum number of suspended strings while reparsing handler output.
    pub max_reparse_depth: usize,
    pub unterminated: UnterminatedPolicy,
}

impl ScanOptions {
    pub const DEFAULT_MAX_REPARSE_DEPTH: usize = 64;
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_reparse_depth: Self::DEFAULT_MAX_REPARSE_DEPTH,
            unterminated: UnterminatedPolicy::Error,
        }
    }
}
