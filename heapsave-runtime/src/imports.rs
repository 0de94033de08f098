//! WASM import functions for heapsave-runtime
//!
//! This module declares the functions the host provides. Pointers are
//! offsets into this module's linear memory.

#[cfg(all(target_arch = "wasm32", not(feature = "test-utils")))]
#[link(wasm_import_module = "env")]
extern "C" {
    /// Offer `size` bytes at `data_ptr` as a file named by the NUL-terminated
    /// string at `filename_ptr`
    pub fn download(filename_ptr: i32, data_ptr: i32, size: i32);
    pub fn __stdout(s: i32);
    pub fn __stderr(s: i32);
}

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
pub mod externs {
    use std::io::{self, Write};

    /// Write to stdout in test environment
    pub fn write_to_stdout(s: &str) {
        print!("{}", s);
        let _ = io::stdout().flush();
    }

    /// Write to stderr in test environment
    pub fn write_to_stderr(s: &str) {
        eprint!("{}", s);
        let _ = io::stderr().flush();
    }
}

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
pub mod exports {
    use std::cell::RefCell;

    /// A file handed to the recording host
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SavedFile {
        pub filename: String,
        pub data: Vec<u8>,
    }

    thread_local! {
        static SAVED_FILES: RefCell<Vec<SavedFile>> = RefCell::new(Vec::new());
    }

    /// Record a download instead of calling the host
    pub fn download(filename: &str, data: &[u8]) {
        SAVED_FILES.with(|files| {
            files.borrow_mut().push(SavedFile {
                filename: filename.to_string(),
                data: data.to_vec(),
            });
        });
    }

    /// Drain every download recorded on this thread
    pub fn take_saved_files() -> Vec<SavedFile> {
        SAVED_FILES.with(|files| std::mem::take(&mut *files.borrow_mut()))
    }

    /// Forget every download recorded on this thread
    pub fn clear_saved_files() {
        SAVED_FILES.with(|files| files.borrow_mut().clear());
    }
}
