//! Error types for stock_watch

use thiserror::Error;

/// Unified error type for stock_watch operations
#[derive(Debug, Error)]
pub enum StockError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP error status code
    #[error("HTTP error: {0}")]
    HttpStatus(reqwest::StatusCode),
    /// Failed to parse JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot has no `data` list at the top level
    #[error("Snapshot missing item list (found {0})")]
    MissingItemList(&'static str),
    /// Delivery collaborator rejected a message
    #[error("Notification failed: {0}")]
    Notify(String),
}

/// Result alias for stock_watch operations
pub type Result<T> = std::result::Result<T, StockError>;
