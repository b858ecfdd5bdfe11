//! Object-storage capability for the Mediaforge pipeline.
//!
//! The pipeline only needs "store bytes at a key, read bytes back"; the
//! [`Storage`] trait captures that contract and [`LocalStorage`] provides
//! a filesystem backend. Derivative key construction lives in [`keys`] so
//! every backend produces the same layout.

pub mod keys;
pub mod local;
pub mod traits;

pub use keys::{derivative_key, sanitize_stem};
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult};

/// Storage backend type identifier, returned by
/// [`Storage::backend_type`]. Only [`LocalStorage`] lives in this crate;
/// `S3` is the identifier an external object-store implementation of the
/// trait reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Local => write!(f, "local"),
            StorageBackend::S3 => write!(f, "s3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_identifiers() {
        assert_eq!(StorageBackend::Local.to_string(), "local");
        assert_eq!(StorageBackend::S3.to_string(), "s3");
        assert_ne!(StorageBackend::Local, StorageBackend::S3);
    }
}
