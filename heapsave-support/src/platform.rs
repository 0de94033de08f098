//! Host platform primitives used to offer a file to the user
//!
//! A save is modelled on the browser's download flow: wrap the bytes in a
//! blob, mint an object URL for it, bind the URL to a hidden anchor element
//! and click it. Native hosts implement the same steps with their own
//! handles, which keeps the trigger sequence identical everywhere.

use crate::error::Result;

/// The primitives a host needs to provide for [`crate::DownloadTrigger`]
///
/// Every method takes `&self` so the trigger can hold cleanup guards while
/// it keeps driving the platform. Implementations that track state use
/// interior mutability.
pub trait SavePlatform {
    /// Handle to an in-memory binary object
    type Blob;

    /// Handle to a transient interactive element
    type Element;

    /// Wrap `data` as a binary object tagged with `mime_type`
    fn create_blob(&self, data: &[u8], mime_type: &str) -> Result<Self::Blob>;

    /// Mint a temporary URL that refers to `blob`
    fn create_object_url(&self, blob: &Self::Blob) -> Result<String>;

    /// Release a URL returned by [`SavePlatform::create_object_url`]
    fn revoke_object_url(&self, url: &str) -> Result<()>;

    /// Create an invisible anchor and attach it to the document
    fn create_anchor(&self) -> Result<Self::Element>;

    /// Point `anchor` at `href`, suggest `filename` and activate it
    fn activate(&self, anchor: &Self::Element, href: &str, filename: &str) -> Result<()>;

    /// Detach an anchor returned by [`SavePlatform::create_anchor`]
    fn remove_anchor(&self, anchor: &Self::Element) -> Result<()>;
}

impl<P: SavePlatform + ?Sized> SavePlatform for &P {
    type Blob = P::Blob;
    type Element = P::Element;

    fn create_blob(&self, data: &[u8], mime_type: &str) -> Result<Self::Blob> {
        (**self).create_blob(data, mime_type)
    }

    fn create_object_url(&self, blob: &Self::Blob) -> Result<String> {
        (**self).create_object_url(blob)
    }

    fn revoke_object_url(&self, url: &str) -> Result<()> {
        (**self).revoke_object_url(url)
    }

    fn create_anchor(&self) -> Result<Self::Element> {
        (**self).create_anchor()
    }

    fn activate(&self, anchor: &Self::Element, href: &str, filename: &str) -> Result<()> {
        (**self).activate(anchor, href, filename)
    }

    fn remove_anchor(&self, anchor: &Self::Element) -> Result<()> {
        (**self).remove_anchor(anchor)
    }
}
