//! heapsave: save files straight out of a WebAssembly guest's memory
//!
//! The guest calls an imported `download(filename_ptr, data_ptr, size)`
//! function; the host copies the NUL-terminated filename and the byte range
//! out of the guest's linear memory and offers them through a
//! [`heapsave_support::SavePlatform`].
//!
//! This crate is the native host:
//!
//! - [`runtime::WasmRuntime`] runs guests under wasmtime and serves the import
//! - [`adapters::DirectorySavePlatform`] writes downloads into a directory
//! - [`config::RuntimeConfig`] holds the JSON-loadable settings

pub mod adapters;
pub mod config;
pub mod error;
pub mod runtime;

#[cfg(test)]
mod tests;

pub use adapters::DirectorySavePlatform;
pub use config::RuntimeConfig;
pub use error::{Error, Result};
pub use heapsave_support::{DownloadRequest, DownloadTrigger, MemorySavePlatform, SavePlatform, SaveReceipt};
pub use runtime::{DownloadImport, ModuleInfo, RunReport, WasmRuntime};
