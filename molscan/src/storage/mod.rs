//! Content-addressed blob storage.
//!
//! Every distinct image is kept as two sibling files in the work directory:
//! `<id>.image` holds the raw bytes and `<id>.json` the metadata record.
//! The id is a truncated SHA-256 of the bytes, see [`content_id`].

mod content_store;

pub use content_store::{content_id, is_content_id, ContentStore, DIGEST_BYTES};
