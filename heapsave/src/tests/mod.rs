//! Test suite for the heapsave host
//!
//! Guests are written inline in the WebAssembly text format so each test
//! controls exactly which pointers reach the `download` import. The
//! heapsave-minimal guest is exercised too when it has been built.

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::runtime::WasmRuntime;
use std::path::PathBuf;


/// Test configuration and utilities
pub struct TestConfig {
    pub wasm_path: PathBuf,
}

impl TestConfig {
    pub fn new() -> Self {
        let wasm_path = match option_env!("HEAPSAVE_MINIMAL_WASM") {
            Some(path) => PathBuf::from(path),
            None => std::env::var("HEAPSAVE_MINIMAL_WASM").map(PathBuf::from).unwrap_or_else(|_| {
                PathBuf::from("../target/heapsave-minimal/wasm32-unknown-unknown/release/heapsave_minimal.wasm")
            }),
        };
        Self { wasm_path }
    }

    /// Load the heapsave-minimal guest, or `None` if it has not been built
    pub fn minimal_runtime(&self, config: RuntimeConfig) -> Option<Result<WasmRuntime>> {
        if !self.wasm_path.exists() {
            eprintln!(
                "skipping: {} not built (set HEAPSAVE_BUILD_WASM=1)",
                self.wasm_path.display()
            );
            return None;
        }
        Some(WasmRuntime::new(&self.wasm_path, config))
    }
}

/// Builds WAT guests around the `download` import
pub struct TestUtils;

impl TestUtils {
    /// Offset the filename is placed at
    pub const FILENAME_PTR: i32 = 16;

    /// Offset the data is placed at
    pub const DATA_PTR: i32 = 1024;

    /// Encode bytes as a WAT string literal
    pub fn wat_bytes(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("\\{:02x}", b)).collect()
    }

    /// A one-page guest with `filename\0` at [`Self::FILENAME_PTR`] and `data`
    /// at [`Self::DATA_PTR`]
    ///
    /// Exports:
    /// - `main()`: downloads the whole of `data`
    /// - `download_at(name_ptr, data_ptr, size)`: forwards to the import
    pub fn guest(filename: &str, data: &[u8]) -> String {
        let mut name = filename.as_bytes().to_vec();
        name.push(0);
        format!(
            r#"
            (module
                (import "env" "download" (func $download (param i32 i32 i32)))
                (memory (export "memory") 1)
                (data (i32.const {name_ptr}) "{name}")
                (data (i32.const {data_ptr}) "{data}")
                (func (export "main")
                    (call $download (i32.const {name_ptr}) (i32.const {data_ptr}) (i32.const {size})))
                (func (export "download_at") (param i32 i32 i32)
                    (call $download (local.get 0) (local.get 1) (local.get 2)))
            )
            "#,
            name_ptr = Self::FILENAME_PTR,
            data_ptr = Self::DATA_PTR,
            size = data.len(),
            name = Self::wat_bytes(&name),
            data = Self::wat_bytes(data),
        )
    }

    /// Compile [`Self::guest`] with the default configuration
    pub fn runtime(filename: &str, data: &[u8]) -> WasmRuntime {
        WasmRuntime::from_wat(&Self::guest(filename, data), RuntimeConfig::default())
            .expect("test guest should compile")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::new();
        assert!(config.wasm_path.to_string_lossy().contains("heapsave_minimal.wasm"));
    }

    #[test]
    fn test_wat_bytes() {
        assert_eq!(TestUtils::wat_bytes(&[0x01, 0xff, b'a']), "\\01\\ff\\61");
        assert_eq!(TestUtils::wat_bytes(&[]), "");
    }
}
