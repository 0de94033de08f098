//! Directory-backed save platform
//!
//! The native counterpart of the browser download flow. Object URLs are
//! `blob:heapsave/<uuid>` handles into a staging table, and clicking an
//! anchor writes the staged blob into the output directory under the
//! suggested name.

use crate::error::Result;
use heapsave_support::{Error as SupportError, Result as SupportResult, SavePlatform};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Name used when the suggested filename has no usable final component
const FALLBACK_FILENAME: &str = "download";

/// Bytes staged behind an object URL
#[derive(Debug, Clone)]
pub struct StagedBlob {
    data: Arc<Vec<u8>>,
}

/// Anchor handle issued by [`DirectorySavePlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DirectoryAnchor(Uuid);

/// Save platform that writes activated downloads to a directory
#[derive(Debug, Clone)]
pub struct DirectorySavePlatform {
    output_dir: PathBuf,
    overwrite: bool,
    state: Arc<Mutex<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    urls: HashMap<String, StagedBlob>,
    anchors: HashSet<DirectoryAnchor>,
    saved: Vec<PathBuf>,
}

impl DirectorySavePlatform {
    /// Create a platform writing into `output_dir`, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created
    pub fn new<P: AsRef<Path>>(output_dir: P, overwrite: bool) -> Result<Self> {
        let output_dir = output_dir.as_ref().to_path_buf();
        fs::create_dir_all(&output_dir)?;
        log::debug!("Saving downloads to {}", output_dir.display());
        Ok(Self {
            output_dir,
            overwrite,
            state: Arc::new(Mutex::new(DirectoryState::default())),
        })
    }

    /// The directory files are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Paths of every file written, oldest first
    pub fn saved_files(&self) -> Vec<PathBuf> {
        self.lock().saved.clone()
    }

    /// Number of object URLs not yet revoked
    pub fn live_url_count(&self) -> usize {
        self.lock().urls.len()
    }

    /// Number of anchors not yet removed
    pub fn live_anchor_count(&self) -> usize {
        self.lock().anchors.len()
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Pick the path a download named `filename` is written to
    fn target_path(&self, filename: &str) -> PathBuf {
        let name = sanitize_filename(filename);
        let path = self.output_dir.join(&name);
        if self.overwrite || !path.exists() {
            return path;
        }

        // Same scheme browsers use: "fractal (1).raw", "fractal (2).raw", ...
        let (stem, extension) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name.as_str(), ""),
        };
        (1u32..)
            .map(|n| self.output_dir.join(format!("{} ({}){}", stem, n, extension)))
            .find(|candidate| !candidate.exists())
            .unwrap_or(path)
    }
}

/// Reduce a suggested filename to a bare file name
///
/// Directory components are dropped so a guest cannot write outside the
/// output directory.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();
    match name {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}

impl SavePlatform for DirectorySavePlatform {
    type Blob = StagedBlob;
    type Element = DirectoryAnchor;

    fn create_blob(&self, data: &[u8], _mime_type: &str) -> SupportResult<StagedBlob> {
        Ok(StagedBlob {
            data: Arc::new(data.to_vec()),
        })
    }

    fn create_object_url(&self, blob: &StagedBlob) -> SupportResult<String> {
        let url = format!("blob:heapsave/{}", Uuid::new_v4());
        self.lock().urls.insert(url.clone(), blob.clone());
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) -> SupportResult<()> {
        match self.lock().urls.remove(url) {
            Some(_) => Ok(()),
            None => Err(SupportError::Platform(format!("object URL {} is not live", url))),
        }
    }

    fn create_anchor(&self) -> SupportResult<DirectoryAnchor> {
        let anchor = DirectoryAnchor(Uuid::new_v4());
        self.lock().anchors.insert(anchor);
        Ok(anchor)
    }

    fn activate(&self, anchor: &DirectoryAnchor, href: &str, filename: &str) -> SupportResult<()> {
        let blob = {
            let state = self.lock();
            if !state.anchors.contains(anchor) {
                return Err(SupportError::Platform("anchor is not attached".to_string()));
            }
            state
                .urls
                .get(href)
                .cloned()
                .ok_or_else(|| SupportError::Platform(format!("object URL {} is not live", href)))?
        };

        let path = self.target_path(filename);
        fs::write(&path, blob.data.as_slice())
            .map_err(|e| SupportError::Platform(format!("failed to write {}: {}", path.display(), e)))?;
        log::info!("Saved {} bytes to {}", blob.data.len(), path.display());
        self.lock().saved.push(path);
        Ok(())
    }

    fn remove_anchor(&self, anchor: &DirectoryAnchor) -> SupportResult<()> {
        if self.lock().anchors.remove(anchor) {
            Ok(())
        } else {
            Err(SupportError::Platform("anchor is not attached".to_string()))
        }
    }
}
