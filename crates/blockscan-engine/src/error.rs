#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("handler for block {block} failed: {source}")]
    Handler {
        block: String,
        source: anyhow::Error,
    },
    #[error("unterminated block {block} opened at offset {offset}")]
    Unterminated { block: String, offset: usize },
    #[error("reparse of block {block} exceeded the maximum depth of {limit}")]
    ReparseLimit { block: String, limit: usize },
}
