//! Error types for the heapsave host

use thiserror::Error;

/// Errors raised by the native host
#[derive(Error, Debug)]
pub enum Error {
    /// Compiling, linking or running the guest failed
    #[error("wasm error: {0}")]
    Wasm(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is unusable
    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Support(#[from] heapsave_support::Error),

    /// Error chain raised by wasmtime or a host function
    #[error("{0:#}")]
    Other(#[from] anyhow::Error),
}

/// Result type for the heapsave host
pub type Result<T> = std::result::Result<T, Error>;
