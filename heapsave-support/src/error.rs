//! Error types shared by every heapsave host

use thiserror::Error;

/// Errors raised while reading guest memory or driving a save platform
#[derive(Error, Debug)]
pub enum Error {
    /// A requested range does not fit inside guest memory
    #[error("memory range {offset}+{len} is out of bounds (memory size {memory_size})")]
    OutOfBounds {
        offset: usize,
        len: usize,
        memory_size: usize,
    },

    /// No NUL terminator was found before the end of guest memory
    #[error("string at offset {offset} is not NUL-terminated")]
    UnterminatedString { offset: usize },

    /// The guest does not export the memory the host was told to read
    #[error("guest module does not export memory `{0}`")]
    MissingMemory(String),

    /// The host platform refused one of the save steps
    #[error("platform error: {0}")]
    Platform(String),
}

/// Result type for heapsave-support
pub type Result<T> = std::result::Result<T, Error>;
