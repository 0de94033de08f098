//! heapsave for the browser
//!
//! Serves a WebAssembly guest's `download(filenamePtr, dataPtr, size)`
//! import by building a `Blob` from the guest's memory, binding it to a
//! hidden anchor through an object URL and clicking it.
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { DownloadHost } from 'heapsave_web';
//!
//! async function main() {
//!     await init();
//!
//!     const host = new DownloadHost();
//!     const imports = { env: {} };
//!     host.registerImports(imports, 'env');
//!
//!     const { instance } = await WebAssembly.instantiateStreaming(fetch('guest.wasm'), imports);
//!     host.attachMemory(instance.exports.memory);
//!     instance.exports.export_fractal(1920, 1080);
//! }
//! ```
//!
//! Records from the `log` facade go to the browser console at `info` and
//! above; `setLogLevel('debug')` shows the individual save steps.
//!
//! Emscripten builds that call `window.download(...)` from `EM_ASM` can use
//! `installGlobal()` after attaching `wasmMemory`, or `downloadFromHeap`
//! with `Module.HEAPU8`.

use wasm_bindgen::prelude::*;

mod error;
mod host;
mod logger;
mod memory;
mod platform;

pub use error::{js_error, to_js};
pub use host::{download_bytes, download_from_heap, DownloadHost};
pub use logger::{init_logger, set_log_level, ConsoleLogger, DEFAULT_LEVEL};
pub use memory::JsGuestMemory;
pub use platform::BrowserSavePlatform;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    logger::init_logger();
}

/// Get the library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
