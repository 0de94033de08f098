//! JavaScript entry points
//!
//! [`DownloadHost`] is the explicit registration object: JS hands it the
//! guest's import object and memory, and it publishes a `download`
//! function there. Nothing is installed globally unless `installGlobal` is
//! called.

use crate::error::to_js;
use crate::memory::JsGuestMemory;
use crate::platform::BrowserSavePlatform;
use heapsave_support::{DownloadRequest, DownloadTrigger, GuestMemory};
use js_sys::{Object, Reflect, Uint8Array, WebAssembly};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsError};

/// Name the import is published under
const DOWNLOAD_IMPORT: &str = "download";

/// Serves `download(filenamePtr, dataPtr, size)` for one guest instance
#[wasm_bindgen]
pub struct DownloadHost {
    inner: Rc<HostInner>,
}

struct HostInner {
    memory: RefCell<Option<WebAssembly::Memory>>,
    trigger: RefCell<DownloadTrigger>,
}

impl HostInner {
    fn download(&self, filename_ptr: u32, data_ptr: u32, size: u32) -> Result<(), JsValue> {
        let memory = self
            .memory
            .borrow()
            .as_ref()
            .map(JsGuestMemory::new)
            .ok_or_else(|| JsValue::from(JsError::new("no guest memory attached; call attachMemory first")))?;
        let trigger = self.trigger.borrow().clone();
        trigger_on_page(&trigger, &memory, filename_ptr, data_ptr, size)
    }
}

/// Copy the request out of `memory` and run it on the current page
fn trigger_on_page<M: GuestMemory + ?Sized>(
    trigger: &DownloadTrigger,
    memory: &M,
    filename_ptr: u32,
    data_ptr: u32,
    size: u32,
) -> Result<(), JsValue> {
    // Validate before touching the DOM so bad pointers leave no trace.
    let request = DownloadRequest::from_memory(
        memory,
        filename_ptr as usize,
        data_ptr as usize,
        size as usize,
    )
    .map_err(to_js)?;
    let platform = BrowserSavePlatform::new()?;
    trigger.save(&platform, &request).map(|_| ()).map_err(to_js)
}

#[wasm_bindgen]
impl DownloadHost {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DownloadHost {
        DownloadHost {
            inner: Rc::new(HostInner {
                memory: RefCell::new(None),
                trigger: RefCell::new(DownloadTrigger::new()),
            }),
        }
    }

    /// Type tag given to every blob, `octet/stream` by default
    #[wasm_bindgen(getter = mimeType)]
    pub fn mime_type(&self) -> String {
        self.inner.trigger.borrow().mime_type().to_string()
    }

    #[wasm_bindgen(setter = mimeType)]
    pub fn set_mime_type(&self, mime_type: String) {
        let trigger = self.inner.trigger.borrow().clone().with_mime_type(mime_type);
        *self.inner.trigger.borrow_mut() = trigger;
    }

    /// Read guest pointers from `memory`
    #[wasm_bindgen(js_name = attachMemory)]
    pub fn attach_memory(&self, memory: WebAssembly::Memory) {
        *self.inner.memory.borrow_mut() = Some(memory);
    }

    /// Offer the guest file described by the three arguments
    ///
    /// Throws if no memory is attached, a range is out of bounds, or the
    /// browser rejects a step.
    pub fn download(&self, filename_ptr: u32, data_ptr: u32, size: u32) -> Result<(), JsValue> {
        self.inner.download(filename_ptr, data_ptr, size)
    }

    /// Publish `download` as `imports[moduleName].download`
    ///
    /// The namespace object is created if `imports` does not have one yet.
    #[wasm_bindgen(js_name = registerImports)]
    pub fn register_imports(&self, imports: &Object, module_name: &str) -> Result<(), JsValue> {
        let key = JsValue::from_str(module_name);
        let namespace = Reflect::get(imports, &key)?;
        let namespace: Object = if namespace.is_undefined() {
            let namespace = Object::new();
            Reflect::set(imports, &key, &namespace)?;
            namespace
        } else {
            namespace.dyn_into()?
        };

        self.publish(&namespace)?;
        log::debug!("Registered {}.{}", module_name, DOWNLOAD_IMPORT);
        Ok(())
    }

    /// Publish `download` on the global object, for callers that expect
    /// `window.download`
    #[wasm_bindgen(js_name = installGlobal)]
    pub fn install_global(&self) -> Result<(), JsValue> {
        self.publish(&js_sys::global())
    }
}

impl Default for DownloadHost {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadHost {
    fn publish(&self, target: &Object) -> Result<(), JsValue> {
        let inner = Rc::clone(&self.inner);
        let closure = Closure::<dyn Fn(u32, u32, u32)>::new(move |filename_ptr, data_ptr, size| {
            if let Err(e) = inner.download(filename_ptr, data_ptr, size) {
                wasm_bindgen::throw_val(e);
            }
        });
        Reflect::set(target, &JsValue::from_str(DOWNLOAD_IMPORT), closure.as_ref())?;
        // The import lives as long as the guest that holds it.
        closure.forget();
        Ok(())
    }
}

/// Offer `data` as a file named `filename`
#[wasm_bindgen(js_name = downloadBytes)]
pub fn download_bytes(filename: &str, data: &[u8]) -> Result<(), JsValue> {
    let platform = BrowserSavePlatform::new()?;
    DownloadTrigger::new()
        .save(&platform, &DownloadRequest::new(filename, data))
        .map(|_| ())
        .map_err(to_js)
}

/// Offer a file out of an Emscripten-style heap view such as `Module.HEAPU8`
///
/// Pass the heap at call time; Emscripten replaces it when memory grows.
#[wasm_bindgen(js_name = downloadFromHeap)]
pub fn download_from_heap(heap: Uint8Array, filename_ptr: u32, data_ptr: u32, size: u32) -> Result<(), JsValue> {
    let memory = JsGuestMemory::from_array(heap);
    trigger_on_page(&DownloadTrigger::new(), &memory, filename_ptr, data_ptr, size)
}
