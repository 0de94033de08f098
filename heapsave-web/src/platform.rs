//! DOM-backed save platform

use crate::error::js_error;
use heapsave_support::{Error, Result, SavePlatform};
use js_sys::{Array, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, HtmlElement, Url};

/// Offers files through the browser's download flow
///
/// Each save appends a hidden `<a download>` to `document.body`, clicks it
/// and removes it again.
#[derive(Debug, Clone)]
pub struct BrowserSavePlatform {
    document: Document,
    body: HtmlElement,
}

impl BrowserSavePlatform {
    /// Bind to the current window's document
    ///
    /// # Errors
    ///
    /// Fails outside of a window with a document body, e.g. in a worker.
    pub fn new() -> std::result::Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let body = document.body().ok_or_else(|| JsValue::from_str("no body"))?;
        Ok(Self { document, body })
    }
}

impl SavePlatform for BrowserSavePlatform {
    type Blob = Blob;
    type Element = HtmlAnchorElement;

    fn create_blob(&self, data: &[u8], mime_type: &str) -> Result<Blob> {
        let parts = Array::new();
        parts.push(&Uint8Array::from(data));
        let options = BlobPropertyBag::new();
        options.set_type(mime_type);
        Blob::new_with_u8_array_sequence_and_options(&parts, &options).map_err(js_error)
    }

    fn create_object_url(&self, blob: &Blob) -> Result<String> {
        Url::create_object_url_with_blob(blob).map_err(js_error)
    }

    fn revoke_object_url(&self, url: &str) -> Result<()> {
        Url::revoke_object_url(url).map_err(js_error)
    }

    fn create_anchor(&self) -> Result<HtmlAnchorElement> {
        let anchor = self
            .document
            .create_element("a")
            .map_err(js_error)?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|_| Error::Platform("created element is not an anchor".to_string()))?;
        anchor
            .style()
            .set_property("display", "none")
            .map_err(js_error)?;
        self.body.append_child(&anchor).map_err(js_error)?;
        Ok(anchor)
    }

    fn activate(&self, anchor: &HtmlAnchorElement, href: &str, filename: &str) -> Result<()> {
        anchor.set_href(href);
        anchor.set_download(filename);
        anchor.click();
        Ok(())
    }

    fn remove_anchor(&self, anchor: &HtmlAnchorElement) -> Result<()> {
        self.body.remove_child(anchor).map(|_| ()).map_err(js_error)
    }
}
