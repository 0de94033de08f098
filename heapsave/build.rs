//! Build script for heapsave
//!
//! Builds the heapsave-minimal guest to wasm32 when `HEAPSAVE_BUILD_WASM` is
//! set, so the end-to-end tests can run it.

use std::env;
use std::path::Path;
use std::process::Command;

fn main() {
    if env::var("HEAPSAVE_BUILD_WASM").is_ok() {
        build_heapsave_minimal_wasm();
    }

    println!("cargo:rerun-if-env-changed=HEAPSAVE_BUILD_WASM");
    println!("cargo:rerun-if-changed=../heapsave-minimal/src");
    println!("cargo:rerun-if-changed=../heapsave-minimal/Cargo.toml");
}

fn build_heapsave_minimal_wasm() {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_dir = Path::new(&manifest_dir).parent().unwrap();
    let minimal_dir = workspace_dir.join("heapsave-minimal");
    // A separate target dir keeps the nested cargo off the outer build lock.
    let target_dir = workspace_dir.join("target/heapsave-minimal");

    println!("cargo:warning=Building heapsave-minimal WASM module...");

    let output = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".to_string()))
        .args([
            "build",
            "--target",
            "wasm32-unknown-unknown",
            "--release",
            "--manifest-path",
            &minimal_dir.join("Cargo.toml").to_string_lossy(),
            "--target-dir",
            &target_dir.to_string_lossy(),
        ])
        .output()
        .expect("Failed to execute cargo build for heapsave-minimal");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!("Failed to build heapsave-minimal WASM: {}", stderr);
    }

    let wasm_path = target_dir.join("wasm32-unknown-unknown/release/heapsave_minimal.wasm");
    println!("cargo:rustc-env=HEAPSAVE_MINIMAL_WASM={}", wasm_path.display());
}
