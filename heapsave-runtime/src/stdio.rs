//! Standard I/O for heapsave guests
//!
//! Text is sent to the host's `__stdout` / `__stderr` imports, which log it.

use std::fmt::{Error, Write};

/// A struct representing standard output
pub struct Stdout(());

/// A struct representing standard error
pub struct Stderr(());

impl Write for Stdout {
    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        write_stdout(s);
        Ok(())
    }
}

impl Write for Stderr {
    fn write_str(&mut self, s: &str) -> Result<(), Error> {
        write_stderr(s);
        Ok(())
    }
}

/// Get a handle to standard output
pub fn stdout() -> Stdout {
    Stdout(())
}

/// Get a handle to standard error
pub fn stderr() -> Stderr {
    Stderr(())
}

#[cfg(all(target_arch = "wasm32", not(feature = "test-utils")))]
pub fn write_stdout(msg: &str) {
    let encoded = crate::wasm::to_arraybuffer_layout(msg.as_bytes());
    unsafe {
        crate::imports::__stdout(encoded.as_ptr() as i32);
    }
}

#[cfg(all(target_arch = "wasm32", not(feature = "test-utils")))]
pub fn write_stderr(msg: &str) {
    let encoded = crate::wasm::to_arraybuffer_layout(msg.as_bytes());
    unsafe {
        crate::imports::__stderr(encoded.as_ptr() as i32);
    }
}

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
pub fn write_stdout(msg: &str) {
    crate::imports::externs::write_to_stdout(msg);
}

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
pub fn write_stderr(msg: &str) {
    crate::imports::externs::write_to_stderr(msg);
}

/// Write a formatted string to standard output, with a newline
pub fn println(args: std::fmt::Arguments) {
    let _ = writeln!(stdout(), "{}", args);
}

/// Write a formatted string to standard error, with a newline
pub fn eprintln(args: std::fmt::Arguments) {
    let _ = writeln!(stderr(), "{}", args);
}

#[macro_export]
macro_rules! println {
    ($($arg:tt)*) => {{
        $crate::stdio::println(format_args!($($arg)*));
    }};
}

#[macro_export]
macro_rules! eprintln {
    ($($arg:tt)*) => {{
        $crate::stdio::eprintln(format_args!($($arg)*));
    }};
}
