use thiserror::Error;

/// Errors that can occur during pack operations.
#[derive(Error, Debug)]
pub enum PackError {
    /// I/O error during read or write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid file header (magic, version, flags, or reserved bytes).
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),
    /// Invalid frame structure (reserved bytes or length).
    #[error("invalid frame at offset {offset}: {reason}")]
    InvalidFrame {
        /// Byte offset where the frame starts.
        offset: u64,
        /// Reason for invalidity.
        reason: String,
    },
    /// Payload exceeds the maximum frame size.
    #[error("payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Actual payload size.
        size: u64,
        /// Maximum allowed size.
        max: u32,
    },
    /// A blob frame payload could not be parsed.
    #[error("invalid blob payload: {0}")]
    InvalidBlob(String),
    /// File is non-empty but too short to hold a header.
    #[error("file is not empty; cannot initialize header")]
    FileNotEmpty,
    /// Truncated frame detected in strict mode.
    #[error("truncated frame at offset {offset}")]
    TruncatedFrame {
        /// Byte offset where truncation occurred.
        offset: u64,
    },
}
