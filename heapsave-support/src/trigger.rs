//! The download trigger
//!
//! This is the host side of the guest's `download(filename_ptr, data_ptr,
//! size)` import. A call copies the filename and bytes out of guest memory,
//! then runs one scoped save sequence on a [`SavePlatform`]:
//!
//! 1. create a hidden anchor and attach it
//! 2. wrap the bytes in a blob and mint an object URL for it
//! 3. set the URL and the suggested filename on the anchor and click it
//! 4. revoke the URL and remove the anchor
//!
//! Step 4 is owned by drop guards and runs on every exit path.

use crate::error::Result;
use crate::memory::{read_bytes, read_c_string, GuestMemory};
use crate::platform::SavePlatform;
use log::{debug, info, warn};

/// Type tag given to every blob unless configured otherwise
pub const DEFAULT_MIME_TYPE: &str = "octet/stream";

/// An owned file ready to be offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Suggested save name
    pub filename: String,
    /// File contents
    pub data: Vec<u8>,
}

impl DownloadRequest {
    pub fn new(filename: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Copy a request out of guest memory
    ///
    /// # Arguments
    ///
    /// * `memory` - The guest's linear memory
    /// * `filename_ptr` - Offset of a NUL-terminated UTF-8 filename
    /// * `data_ptr` - Offset of the first byte of the file
    /// * `size` - Number of bytes in the file
    ///
    /// # Errors
    ///
    /// Returns an error if either range lies outside of `memory` or the
    /// filename is not terminated
    pub fn from_memory<M: GuestMemory + ?Sized>(
        memory: &M,
        filename_ptr: usize,
        data_ptr: usize,
        size: usize,
    ) -> Result<Self> {
        let data = read_bytes(memory, data_ptr, size)?;
        let filename = read_c_string(memory, filename_ptr)?;
        Ok(Self { filename, data })
    }
}

/// What a completed save offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReceipt {
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

/// Runs the save sequence on a platform
#[derive(Debug, Clone)]
pub struct DownloadTrigger {
    mime_type: String,
}

impl Default for DownloadTrigger {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

impl DownloadTrigger {
    /// Create a trigger that tags blobs with [`DEFAULT_MIME_TYPE`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different blob type tag
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// The type tag applied to blobs
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Handle a guest `download(filename_ptr, data_ptr, size)` call
    ///
    /// Both ranges are validated and copied before any platform resource is
    /// created, so a bad pointer leaves nothing behind.
    ///
    /// # Errors
    ///
    /// Returns an error if guest memory cannot be read or any save step fails
    pub fn trigger<P, M>(
        &self,
        platform: &P,
        memory: &M,
        filename_ptr: usize,
        data_ptr: usize,
        size: usize,
    ) -> Result<SaveReceipt>
    where
        P: SavePlatform + ?Sized,
        M: GuestMemory + ?Sized,
    {
        let request = DownloadRequest::from_memory(memory, filename_ptr, data_ptr, size)?;
        self.save(platform, &request)
    }

    /// Offer `request` to the user through `platform`
    ///
    /// # Errors
    ///
    /// Returns the first failing step. Cleanup failures are logged and do not
    /// replace the result.
    pub fn save<P>(&self, platform: &P, request: &DownloadRequest) -> Result<SaveReceipt>
    where
        P: SavePlatform + ?Sized,
    {
        debug!(
            "Saving '{}' ({} bytes, {})",
            request.filename,
            request.data.len(),
            self.mime_type
        );

        // Guards drop in reverse order: the URL is revoked before the anchor
        // is removed.
        let anchor = AnchorGuard {
            platform,
            anchor: platform.create_anchor()?,
        };
        let blob = platform.create_blob(&request.data, &self.mime_type)?;
        let url = ObjectUrlGuard {
            platform,
            url: platform.create_object_url(&blob)?,
        };

        platform.activate(&anchor.anchor, &url.url, &request.filename)?;

        info!("Offered '{}' ({} bytes)", request.filename, request.data.len());
        Ok(SaveReceipt {
            filename: request.filename.clone(),
            size: request.data.len(),
            mime_type: self.mime_type.clone(),
        })
    }
}

struct ObjectUrlGuard<'a, P: SavePlatform + ?Sized> {
    platform: &'a P,
    url: String,
}

impl<P: SavePlatform + ?Sized> Drop for ObjectUrlGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.platform.revoke_object_url(&self.url) {
            warn!("Failed to revoke object URL {}: {}", self.url, e);
        }
    }
}

struct AnchorGuard<'a, P: SavePlatform + ?Sized> {
    platform: &'a P,
    anchor: P::Element,
}

impl<P: SavePlatform + ?Sized> Drop for AnchorGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.platform.remove_anchor(&self.anchor) {
            warn!("Failed to remove download anchor: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemorySavePlatform;
    use crate::error::Error;

    /// Guest memory with "fractal.raw\0" at 16 and [1, 2, 3, 4] at 64
    fn guest_memory() -> Vec<u8> {
        let mut memory = vec![0u8; 128];
        memory[16..27].copy_from_slice(b"fractal.raw");
        memory[64..68].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        memory
    }

    #[test_log::test]
    fn test_trigger_offers_decoded_filename() {
        let platform = MemorySavePlatform::new();
        let receipt = DownloadTrigger::new()
            .trigger(&platform, &guest_memory(), 16, 64, 4)
            .unwrap();

        assert_eq!(receipt.filename, "fractal.raw");
        assert_eq!(receipt.size, 4);
        assert_eq!(receipt.mime_type, "octet/stream");

        let activations = platform.activations();
        assert_eq!(activations.len(), 1);
        assert_eq!(activations[0].filename, "fractal.raw");
        assert_eq!(activations[0].data, vec![0x01, 0x02, 0x03, 0x04]);

        let blobs = platform.blobs();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size, 4);
        assert_eq!(blobs[0].mime_type, "octet/stream");
    }

    #[test]
    fn test_trigger_releases_url_and_anchor() {
        let platform = MemorySavePlatform::new();
        DownloadTrigger::new()
            .trigger(&platform, &guest_memory(), 16, 64, 4)
            .unwrap();

        assert_eq!(platform.live_url_count(), 0);
        assert_eq!(platform.live_anchor_count(), 0);
        assert_eq!(platform.revoked_urls().len(), 1);
        assert_eq!(platform.revoked_urls()[0], platform.activations()[0].href);
    }

    #[test]
    fn test_consecutive_triggers_are_independent() {
        let platform = MemorySavePlatform::new();
        let trigger = DownloadTrigger::new();
        let memory = guest_memory();
        trigger.trigger(&platform, &memory, 16, 64, 4).unwrap();
        trigger.trigger(&platform, &memory, 16, 65, 2).unwrap();

        let activations = platform.activations();
        assert_eq!(activations.len(), 2);
        assert_ne!(activations[0].href, activations[1].href);
        assert_ne!(activations[0].anchor_id, activations[1].anchor_id);
        assert_eq!(activations[1].data, vec![0x02, 0x03]);
        assert_eq!(platform.live_url_count(), 0);
        assert_eq!(platform.live_anchor_count(), 0);
    }

    #[test]
    fn test_empty_buffer_completes() {
        let platform = MemorySavePlatform::new();
        let receipt = DownloadTrigger::new()
            .trigger(&platform, &guest_memory(), 16, 128, 0)
            .unwrap();

        assert_eq!(receipt.size, 0);
        assert_eq!(platform.blobs()[0].size, 0);
        assert_eq!(platform.activations().len(), 1);
        assert!(platform.activations()[0].data.is_empty());
    }

    #[test]
    fn test_invalid_ranges_create_nothing() {
        let platform = MemorySavePlatform::new();
        let trigger = DownloadTrigger::new();
        let memory = guest_memory();

        assert!(matches!(
            trigger.trigger(&platform, &memory, 16, 126, 4),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            trigger.trigger(&platform, &memory, 500, 64, 4),
            Err(Error::OutOfBounds { .. })
        ));

        let mut unterminated = guest_memory();
        unterminated[120..128].copy_from_slice(b"no-nul!!");
        assert!(matches!(
            trigger.trigger(&platform, &unterminated, 120, 64, 4),
            Err(Error::UnterminatedString { offset: 120 })
        ));

        assert!(platform.blobs().is_empty());
        assert!(platform.activations().is_empty());
        assert_eq!(platform.anchors_created(), 0);
    }

    #[test_log::test]
    fn test_failed_activation_still_cleans_up() {
        let platform = MemorySavePlatform::new();
        platform.fail_activations(true);

        let result = DownloadTrigger::new().trigger(&platform, &guest_memory(), 16, 64, 4);
        assert!(matches!(result, Err(Error::Platform(_))));
        assert!(platform.activations().is_empty());
        assert_eq!(platform.revoked_urls().len(), 1);
        assert_eq!(platform.live_url_count(), 0);
        assert_eq!(platform.live_anchor_count(), 0);
    }

    #[test]
    fn test_custom_mime_type() {
        let platform = MemorySavePlatform::new();
        let trigger = DownloadTrigger::new().with_mime_type("image/png");
        trigger
            .save(&platform, &DownloadRequest::new("fractal.png", vec![0x89, b'P']))
            .unwrap();
        assert_eq!(platform.blobs()[0].mime_type, "image/png");
        assert_eq!(platform.activations()[0].mime_type, "image/png");
    }
}
