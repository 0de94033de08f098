//! Memory layout helpers shared with the host

/// Prefix `data` with its length as a little-endian `u32`
///
/// This is the layout the host's `__stdout` and `__stderr` imports read.
pub fn to_arraybuffer_layout(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(4 + data.len());
    result.extend_from_slice(&(data.len() as u32).to_le_bytes());
    result.extend_from_slice(data);
    result
}
