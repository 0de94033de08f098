#![cfg(target_arch = "wasm32")]

use heapsave_support::{read_c_string, DownloadRequest, DownloadTrigger, GuestMemory, SavePlatform};
use heapsave_web::{
    download_bytes, download_from_heap, init, set_log_level, BrowserSavePlatform, DownloadHost, JsGuestMemory,
};
use js_sys::{Function, Object, Reflect, Uint8Array, WebAssembly};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;
use web_sys::{Blob, HtmlAnchorElement};

wasm_bindgen_test_configure!(run_in_browser);

/// One page of memory with "fractal.raw\0" at 16 and [1, 2, 3, 4] at 64
fn guest_memory() -> WebAssembly::Memory {
    let descriptor = Object::new();
    Reflect::set(&descriptor, &"initial".into(), &1.into()).unwrap();
    let memory = WebAssembly::Memory::new(&descriptor).unwrap();

    let bytes = Uint8Array::new(&memory.buffer());
    bytes.subarray(16, 28).copy_from(b"fractal.raw\0");
    bytes.subarray(64, 68).copy_from(&[0x01, 0x02, 0x03, 0x04]);
    memory
}

fn body_children() -> u32 {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
        .map(|b| b.child_element_count())
        .unwrap()
}

#[wasm_bindgen_test]
fn test_js_memory_reads_guest_bytes() {
    let memory = JsGuestMemory::new(&guest_memory());
    assert_eq!(memory.size(), 65536);

    let mut buf = [0u8; 4];
    memory.read(64, &mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3, 4]);
    assert_eq!(read_c_string(&memory, 16).unwrap(), "fractal.raw");
    assert!(memory.read(65534, &mut buf).is_err());
}

#[wasm_bindgen_test]
fn test_blob_has_size_and_type() {
    let platform = BrowserSavePlatform::new().unwrap();
    let blob = platform.create_blob(&[1, 2, 3, 4], "octet/stream").unwrap();
    assert_eq!(blob.size(), 4.0);
    assert_eq!(blob.type_(), "octet/stream");

    let empty = platform.create_blob(&[], "octet/stream").unwrap();
    assert_eq!(empty.size(), 0.0);
}

#[wasm_bindgen_test]
fn test_trigger_removes_anchor() {
    let before = body_children();
    let platform = BrowserSavePlatform::new().unwrap();
    let receipt = DownloadTrigger::new()
        .trigger(&platform, &JsGuestMemory::new(&guest_memory()), 16, 64, 4)
        .unwrap();

    assert_eq!(receipt.filename, "fractal.raw");
    assert_eq!(receipt.size, 4);
    assert_eq!(body_children(), before);
}

#[wasm_bindgen_test]
fn test_host_download() {
    let host = DownloadHost::new();
    assert!(host.download(16, 64, 4).is_err());

    host.attach_memory(guest_memory());
    let before = body_children();
    host.download(16, 64, 4).unwrap();
    host.download(16, 64, 0).unwrap();
    assert_eq!(body_children(), before);

    assert!(host.download(16, 65530, 16).is_err());
    assert_eq!(body_children(), before);
}

#[wasm_bindgen_test]
fn test_mime_type_property() {
    let host = DownloadHost::new();
    assert_eq!(host.mime_type(), "octet/stream");
    host.set_mime_type("image/png".to_string());
    assert_eq!(host.mime_type(), "image/png");
}

#[wasm_bindgen_test]
fn test_register_imports() {
    let host = DownloadHost::new();
    host.attach_memory(guest_memory());

    let imports = Object::new();
    host.register_imports(&imports, "env").unwrap();

    let env = Reflect::get(&imports, &"env".into()).unwrap();
    let download: Function = Reflect::get(&env, &"download".into())
        .unwrap()
        .dyn_into()
        .unwrap();
    download
        .call3(&JsValue::NULL, &16.into(), &64.into(), &4.into())
        .unwrap();

    // Out-of-bounds calls throw into the caller.
    assert!(download
        .call3(&JsValue::NULL, &16.into(), &(-1).into(), &4.into())
        .is_err());
}

#[wasm_bindgen_test]
fn test_download_bytes_and_heap() {
    let before = body_children();
    download_bytes("fractal.raw", &[1, 2, 3, 4]).unwrap();

    let heap = Uint8Array::new(&guest_memory().buffer());
    download_from_heap(heap.clone(), 16, 64, 4).unwrap();
    assert!(download_from_heap(heap, 70000, 64, 4).is_err());
    assert_eq!(body_children(), before);
}

#[wasm_bindgen_test]
fn test_install_global() {
    let host = DownloadHost::new();
    host.attach_memory(guest_memory());
    host.install_global().unwrap();

    let download: Function = Reflect::get(&js_sys::global(), &"download".into())
        .unwrap()
        .dyn_into()
        .unwrap();
    let before = body_children();
    download
        .call3(&JsValue::NULL, &16.into(), &64.into(), &4.into())
        .unwrap();
    assert_eq!(body_children(), before);

    assert!(download
        .call3(&JsValue::NULL, &70000.into(), &64.into(), &4.into())
        .is_err());
}

/// Detaches the anchor right after clicking it, so removing it again throws
struct DetachAfterClick(BrowserSavePlatform);

impl SavePlatform for DetachAfterClick {
    type Blob = Blob;
    type Element = HtmlAnchorElement;

    fn create_blob(&self, data: &[u8], mime_type: &str) -> heapsave_support::Result<Blob> {
        self.0.create_blob(data, mime_type)
    }

    fn create_object_url(&self, blob: &Blob) -> heapsave_support::Result<String> {
        self.0.create_object_url(blob)
    }

    fn revoke_object_url(&self, url: &str) -> heapsave_support::Result<()> {
        self.0.revoke_object_url(url)
    }

    fn create_anchor(&self) -> heapsave_support::Result<HtmlAnchorElement> {
        self.0.create_anchor()
    }

    fn activate(&self, anchor: &HtmlAnchorElement, href: &str, filename: &str) -> heapsave_support::Result<()> {
        self.0.activate(anchor, href, filename)?;
        anchor.remove();
        Ok(())
    }

    fn remove_anchor(&self, anchor: &HtmlAnchorElement) -> heapsave_support::Result<()> {
        self.0.remove_anchor(anchor)
    }
}

#[wasm_bindgen_test]
fn test_cleanup_failure_is_logged_to_console() {
    init();
    let warn = log::Metadata::builder()
        .level(log::Level::Warn)
        .target("heapsave_support::trigger")
        .build();
    assert!(log::logger().enabled(&warn));

    let platform = DetachAfterClick(BrowserSavePlatform::new().unwrap());
    let detached = platform.create_anchor().unwrap();
    detached.remove();
    assert!(platform.remove_anchor(&detached).is_err());

    // The failed removal is only logged; the save itself succeeds.
    let before = body_children();
    let receipt = DownloadTrigger::new()
        .save(&platform, &DownloadRequest::new("fractal.raw", vec![1, 2, 3, 4]))
        .unwrap();
    assert_eq!(receipt.size, 4);
    assert_eq!(body_children(), before);
}

#[wasm_bindgen_test]
fn test_set_log_level() {
    init();
    set_log_level("debug").unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    assert!(set_log_level("loud").is_err());
    assert_eq!(log::max_level(), log::LevelFilter::Debug);

    set_log_level("info").unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Info);
}
