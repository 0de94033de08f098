//! Handing files to the host

use crate::error::{Error, Result};

/// Offer `data` to the user as a file named `filename`
///
/// The host copies both before this returns, so the buffers can be freed
/// right after.
///
/// # Errors
///
/// Returns [`Error::InteriorNul`] if `filename` contains a NUL byte, since
/// the host would silently truncate it, and [`Error::TooLarge`] if `data`
/// cannot be described by the 32-bit ABI.
pub fn save_file(filename: &str, data: &[u8]) -> Result<()> {
    if let Some(position) = filename.bytes().position(|b| b == 0) {
        return Err(Error::InteriorNul(position));
    }
    let size = i32::try_from(data.len()).map_err(|_| Error::TooLarge(data.len()))?;
    host_download(filename, data, size);
    Ok(())
}

#[cfg(all(target_arch = "wasm32", not(feature = "test-utils")))]
fn host_download(filename: &str, data: &[u8], size: i32) {
    let mut name = Vec::with_capacity(filename.len() + 1);
    name.extend_from_slice(filename.as_bytes());
    name.push(0);

    unsafe {
        crate::imports::download(name.as_ptr() as i32, data.as_ptr() as i32, size);
    }
}

#[cfg(any(feature = "test-utils", not(target_arch = "wasm32")))]
fn host_download(filename: &str, data: &[u8], _size: i32) {
    crate::imports::exports::download(filename, data);
}
