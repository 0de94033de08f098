use heapsave_support::memory::check_range;
use heapsave_support::{GuestMemory, Result};
use js_sys::{Uint8Array, WebAssembly};

/// A guest's linear memory as seen from JavaScript
///
/// Growing a `WebAssembly.Memory` detaches its old buffer, so take a fresh
/// view for every call instead of keeping one around.
#[derive(Debug, Clone)]
pub struct JsGuestMemory {
    bytes: Uint8Array,
}

impl JsGuestMemory {
    /// View the current buffer of `memory`
    pub fn new(memory: &WebAssembly::Memory) -> Self {
        Self {
            bytes: Uint8Array::new(&memory.buffer()),
        }
    }

    /// Use an existing byte view such as Emscripten's `HEAPU8`
    pub fn from_array(bytes: Uint8Array) -> Self {
        Self { bytes }
    }
}

impl GuestMemory for JsGuestMemory {
    fn size(&self) -> usize {
        self.bytes.length() as usize
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let end = check_range(self.size(), offset, buf.len())?;
        self.bytes.subarray(offset as u32, end as u32).copy_to(buf);
        Ok(())
    }
}
