//! Guest-side bindings for heapsave
//!
//! Link this crate into a module compiled for `wasm32-unknown-unknown` to
//! hand files to the host:
//!
//! ```ignore
//! heapsave_runtime::save_file("fractal.raw", &pixels)?;
//! ```
//!
//! On non-wasm targets, or with the `test-utils` feature, the host imports
//! are replaced by an in-process recorder so guest code can be unit tested
//! natively.

pub mod error;
pub mod imports;
pub mod save;
pub mod stdio;
pub mod wasm;

pub use error::{Error, Result};
pub use save::save_file;
pub use stdio::{write_stderr, write_stdout};

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
pub use imports::exports::{clear_saved_files, take_saved_files, SavedFile};
