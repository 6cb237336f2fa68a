use thiserror::Error;

/// Engine failure kinds.
///
/// The engine never panics on a recoverable condition: operations return
/// `Result` and background loops log and keep running.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Posting-buffer (or other bulk) allocation failed. The insertion that
    /// hit the failure is dropped; the index stays usable.
    #[error("allocation failed")]
    Alloc(#[from] std::collections::TryReserveError),

    #[error("path too long ({len} bytes)")]
    PathTooLong { len: usize },

    #[error("directory depth {depth} exceeds cap {cap}")]
    DepthExceeded { depth: usize, cap: usize },

    /// Compression or decompression context failure. On commit the
    /// uncompressed posting buffers are left intact for retry.
    #[error("compression context")]
    Compression(#[source] std::io::Error),

    /// A sealed posting payload that does not decode. Indicates a damaged
    /// arena or database image.
    #[error("posting payload corrupt")]
    CorruptPostings,

    #[error("invalid query: {0}")]
    InvalidQuery(&'static str),

    #[error("database io")]
    DatabaseIo(#[source] std::io::Error),

    #[error("database corrupt: {0}")]
    DatabaseCorrupt(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
