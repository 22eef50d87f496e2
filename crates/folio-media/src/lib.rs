//! folio-media: inline image decoding and blob storage for Folio.
//!
//! Documents may carry images inline as `data:image/...;base64,...` strings.
//! [`InlineImage`] decodes them and a [`BlobStore`] persists the bytes,
//! returning a URL that replaces the inline value in the stored document.

pub mod data_uri;
pub mod error;
pub mod store;

pub use data_uri::{INLINE_IMAGE_PREFIX, InlineImage, extension_for, is_inline_image};
pub use error::{MediaError, MediaResult};
pub use store::{BlobStore, FsBlobStore, MemoryBlobStore, StoredBlob, blob_name};
