// src/error.rs

/// Everything that can stop a run. Each variant carries enough context to be
/// turned directly into the failure message returned by the trigger.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The report page had no anchor pointing at a `.pdf`.
    #[error("PDF link not found on the page {0}")]
    NotFound(String),

    /// Non-2xx status from the report site.
    #[error("HTTP error fetching {url}: status={status}")]
    Http { url: String, status: u16 },

    /// Transport-level failure from `reqwest`.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Blob store error: {0}")]
    BlobStore(String),

    /// The extractor produced no table, or could not be run at all.
    #[error("No table found or extraction failed on page {page}: {reason}")]
    Extraction { page: u32, reason: String },

    /// Header cell was not a two-part `\r`-joined label.
    #[error("Malformed header in column {column}: {value:?}")]
    MalformedHeader { column: usize, value: String },

    /// Grid shape does not match the five data columns plus the index column.
    #[error("Malformed table: {0}")]
    MalformedTable(String),

    #[error("Secret access failed for {name}: {reason}")]
    SecretAccess { name: String, reason: String },

    #[error("Load into {table} failed: {reason}")]
    Load { table: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
