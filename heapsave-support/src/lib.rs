//! Common code for heapsave hosts
//!
//! This crate holds everything a host needs to turn a guest's
//! `download(filename_ptr, data_ptr, size)` call into a file save, without
//! depending on any particular WebAssembly engine or platform:
//!
//! - [`GuestMemory`]: bounds-checked reads from a guest's linear memory
//! - [`SavePlatform`]: the blob / object URL / anchor primitives of a host
//! - [`DownloadTrigger`]: the scoped create-click-revoke sequence
//! - [`MemorySavePlatform`]: a recording platform for tests and embedders

pub mod adapters;
pub mod error;
pub mod memory;
pub mod platform;
pub mod trigger;

pub use adapters::{Activation, MemorySavePlatform, RecordedBlob};
pub use error::{Error, Result};
pub use memory::{read_bytes, read_c_string, GuestMemory};
pub use platform::SavePlatform;
pub use trigger::{DownloadRequest, DownloadTrigger, SaveReceipt, DEFAULT_MIME_TYPE};
