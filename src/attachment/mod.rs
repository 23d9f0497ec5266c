//! File attachments on posts.
//!
//! File bodies live in a sharded [`FileStorage`] directory and their
//! metadata in the `attachments` table.

mod repository;
mod service;
mod storage;

pub use repository::{Attachment, AttachmentRepository, NewAttachment};
pub use service::{
    content_disposition, sanitize_filename, AttachmentService, Download, MAX_FILENAME_LENGTH,
};
pub use storage::FileStorage;
