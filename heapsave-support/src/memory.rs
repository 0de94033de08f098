//! Guest linear memory access
//!
//! Hosts never hold on to guest memory. Every read copies the requested
//! bytes out at the moment of the call, so a guest that grows or reuses its
//! memory afterwards cannot alias anything the host is still using.

use crate::error::{Error, Result};

/// Chunk size used when scanning for a string terminator
const SCAN_CHUNK: usize = 64;

/// Read-only view of a guest's linear memory
pub trait GuestMemory {
    /// The current size of the memory in bytes
    fn size(&self) -> usize;

    /// Copy `buf.len()` bytes starting at `offset` into `buf`
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfBounds`] if the range does not fit in memory
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()>;
}

impl GuestMemory for [u8] {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let end = check_range(self.len(), offset, buf.len())?;
        buf.copy_from_slice(&self[offset..end]);
        Ok(())
    }
}

impl GuestMemory for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        self.as_slice().read(offset, buf)
    }
}

/// Validate that `offset..offset + len` lies inside a memory of `memory_size`
/// bytes and return the end of the range
pub fn check_range(memory_size: usize, offset: usize, len: usize) -> Result<usize> {
    match offset.checked_add(len) {
        Some(end) if end <= memory_size => Ok(end),
        _ => Err(Error::OutOfBounds {
            offset,
            len,
            memory_size,
        }),
    }
}

/// Reinterpret an address or size received over the wasm32 ABI
///
/// Guest pointers arrive as `i32` but wasm32 addresses are unsigned.
pub fn abi_to_usize(value: i32) -> usize {
    value as u32 as usize
}

/// Copy `size` bytes starting at `ptr` out of guest memory
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if the range does not fit in memory
pub fn read_bytes<M: GuestMemory + ?Sized>(memory: &M, ptr: usize, size: usize) -> Result<Vec<u8>> {
    check_range(memory.size(), ptr, size)?;
    let mut data = vec![0u8; size];
    memory.read(ptr, &mut data)?;
    Ok(data)
}

/// Decode the NUL-terminated string starting at `ptr`
///
/// Invalid UTF-8 sequences are replaced with U+FFFD rather than rejected.
///
/// # Errors
///
/// Returns [`Error::OutOfBounds`] if `ptr` is past the end of memory and
/// [`Error::UnterminatedString`] if memory ends before a NUL byte
pub fn read_c_string<M: GuestMemory + ?Sized>(memory: &M, ptr: usize) -> Result<String> {
    let memory_size = memory.size();
    if ptr > memory_size {
        return Err(Error::OutOfBounds {
            offset: ptr,
            len: 1,
            memory_size,
        });
    }

    let mut bytes = Vec::new();
    let mut chunk = [0u8; SCAN_CHUNK];
    let mut offset = ptr;
    while offset < memory_size {
        let len = SCAN_CHUNK.min(memory_size - offset);
        memory.read(offset, &mut chunk[..len])?;
        if let Some(nul) = chunk[..len].iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&chunk[..nul]);
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        bytes.extend_from_slice(&chunk[..len]);
        offset += len;
    }

    Err(Error::UnterminatedString { offset: ptr })
}
