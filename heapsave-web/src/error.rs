use heapsave_support::Error;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsError};

/// Wrap an exception thrown by a browser API
pub fn js_error(value: JsValue) -> Error {
    let message = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value));
    Error::Platform(message)
}

/// Convert an error into a JS `Error` for throwing
pub fn to_js(error: Error) -> JsValue {
    JsError::new(&error.to_string()).into()
}
