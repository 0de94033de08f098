//! Error types for heapsave-runtime

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The host reads filenames up to the first NUL byte
    #[error("filename contains a NUL byte at position {0}")]
    InteriorNul(usize),

    /// wasm32 cannot address a buffer this large
    #[error("buffer of {0} bytes does not fit the download ABI")]
    TooLarge(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
