//! The object-storage capability the driver needs, kept deliberately
//! narrow: list immutable blobs under a prefix, stat one, stream it
//! down, stream one up. The production client (auth, retries,
//! multipart upload) is out of scope — only the shape other stages
//! depend on lives here.

pub mod local;

use std::io::Read;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub size_bytes: u64,
}

/// A capability over a bucket-like tree of immutable blobs.
pub trait ObjectStore {
    fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
    fn stat(&self, key: &str) -> Result<Option<ObjectMetadata>, StorageError>;
    fn get_stream(&self, key: &str) -> Result<Box<dyn Read>, StorageError>;
    fn put_stream(&self, key: &str, content_type: &str, body: Box<dyn Read>) -> Result<(), StorageError>;
}

pub use local::LocalFsStore;
