//! In-memory save platform
//!
//! [`MemorySavePlatform`] implements every save step with plain Rust state
//! and records what happened, so tests can assert on activations and on
//! leaked handles without a browser. Clones share the same records.

use crate::error::{Error, Result};
use crate::platform::SavePlatform;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// A blob created on a [`MemorySavePlatform`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBlob {
    pub size: usize,
    pub mime_type: String,
}

/// One activated download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Identifier of the anchor that was clicked
    pub anchor_id: u64,
    /// Object URL the anchor pointed at
    pub href: String,
    /// Suggested save name
    pub filename: String,
    /// Type tag of the blob behind `href`
    pub mime_type: String,
    /// Contents of the blob behind `href`
    pub data: Vec<u8>,
}

/// Blob handle issued by [`MemorySavePlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlob(usize);

/// Anchor handle issued by [`MemorySavePlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAnchor(u64);

/// Recording save platform
#[derive(Debug, Clone, Default)]
pub struct MemorySavePlatform {
    state: Arc<Mutex<PlatformState>>,
}

#[derive(Debug, Default)]
struct PlatformState {
    /// Every blob ever created, indexed by `MemoryBlob`
    blobs: Vec<(Vec<u8>, String)>,

    /// Object URLs that have not been revoked yet
    live_urls: HashMap<String, usize>,

    /// Object URLs in the order they were revoked
    revoked_urls: Vec<String>,

    /// Anchors currently attached to the document
    live_anchors: HashSet<u64>,

    anchors_created: u64,
    urls_created: u64,

    activations: Vec<Activation>,

    /// Reject every activation with a platform error
    fail_activations: bool,
}

impl MemorySavePlatform {
    /// Create an empty platform
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following activation fail
    pub fn fail_activations(&self, fail: bool) {
        self.lock().fail_activations = fail;
    }

    /// Every completed activation, oldest first
    pub fn activations(&self) -> Vec<Activation> {
        self.lock().activations.clone()
    }

    /// Every blob created, oldest first
    pub fn blobs(&self) -> Vec<RecordedBlob> {
        self.lock()
            .blobs
            .iter()
            .map(|(data, mime_type)| RecordedBlob {
                size: data.len(),
                mime_type: mime_type.clone(),
            })
            .collect()
    }

    /// Object URLs in the order they were revoked
    pub fn revoked_urls(&self) -> Vec<String> {
        self.lock().revoked_urls.clone()
    }

    /// Number of object URLs created and not yet revoked
    pub fn live_url_count(&self) -> usize {
        self.lock().live_urls.len()
    }

    /// Number of anchors attached and not yet removed
    pub fn live_anchor_count(&self) -> usize {
        self.lock().live_anchors.len()
    }

    /// Total number of anchors ever created
    pub fn anchors_created(&self) -> u64 {
        self.lock().anchors_created
    }

    /// Forget all records
    pub fn clear(&self) {
        *self.lock() = PlatformState::default();
    }

    fn lock(&self) -> MutexGuard<'_, PlatformState> {
        // Records stay readable after a panicking test thread.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SavePlatform for MemorySavePlatform {
    type Blob = MemoryBlob;
    type Element = MemoryAnchor;

    fn create_blob(&self, data: &[u8], mime_type: &str) -> Result<MemoryBlob> {
        let mut state = self.lock();
        state.blobs.push((data.to_vec(), mime_type.to_string()));
        Ok(MemoryBlob(state.blobs.len() - 1))
    }

    fn create_object_url(&self, blob: &MemoryBlob) -> Result<String> {
        let mut state = self.lock();
        if blob.0 >= state.blobs.len() {
            return Err(Error::Platform(format!("unknown blob {}", blob.0)));
        }
        state.urls_created += 1;
        let url = format!("blob:memory/{}", state.urls_created);
        state.live_urls.insert(url.clone(), blob.0);
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        if state.live_urls.remove(url).is_none() {
            return Err(Error::Platform(format!("object URL {} is not live", url)));
        }
        state.revoked_urls.push(url.to_string());
        Ok(())
    }

    fn create_anchor(&self) -> Result<MemoryAnchor> {
        let mut state = self.lock();
        state.anchors_created += 1;
        let id = state.anchors_created;
        state.live_anchors.insert(id);
        Ok(MemoryAnchor(id))
    }

    fn activate(&self, anchor: &MemoryAnchor, href: &str, filename: &str) -> Result<()> {
        let mut state = self.lock();
        if state.fail_activations {
            return Err(Error::Platform("activation rejected".to_string()));
        }
        if !state.live_anchors.contains(&anchor.0) {
            return Err(Error::Platform(format!("anchor {} is not attached", anchor.0)));
        }
        let blob = *state
            .live_urls
            .get(href)
            .ok_or_else(|| Error::Platform(format!("object URL {} is not live", href)))?;
        let (data, mime_type) = state.blobs[blob].clone();
        state.activations.push(Activation {
            anchor_id: anchor.0,
            href: href.to_string(),
            filename: filename.to_string(),
            mime_type,
            data,
        });
        Ok(())
    }

    fn remove_anchor(&self, anchor: &MemoryAnchor) -> Result<()> {
        if self.lock().live_anchors.remove(&anchor.0) {
            Ok(())
        } else {
            Err(Error::Platform(format!("anchor {} is not attached", anchor.0)))
        }
    }
}
