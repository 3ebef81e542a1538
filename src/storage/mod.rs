//! Binary object storage: save uploaded bytes under a generated name, read them back, hand out URLs.

mod memory;
mod s3;

pub use memory::MemoryObjectStorage;
pub use s3::{S3ObjectStorage, S3Settings};

use crate::error::StorageError;
use async_trait::async_trait;
use std::time::Duration;

/// Default lifetime of a presigned URL.
pub const DEFAULT_URL_EXPIRY: Duration = Duration::from_secs(3600);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UrlOptions {
    pub presigned: bool,
    pub expiry: Duration,
}

impl Default for UrlOptions {
    fn default() -> Self {
        UrlOptions {
            presigned: true,
            expiry: DEFAULT_URL_EXPIRY,
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` and return the generated object name (uuid + original extension).
    async fn store(&self, data: Vec<u8>, filename: &str, content_type: Option<&str>) -> Result<String, StorageError>;

    async fn retrieve(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    async fn url_for(&self, name: &str, options: UrlOptions) -> Result<String, StorageError>;
}

/// `<uuid v4><.ext>` where `.ext` is the lower-cased extension of `filename`, if any.
pub fn object_name_for(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let ext = match base.rfind('.') {
        Some(i) if i > 0 && i + 1 < base.len() => {
            let e = &base[i + 1..];
            if e.chars().all(|c| c.is_ascii_alphanumeric()) {
                format!(".{}", e.to_ascii_lowercase())
            } else {
                String::new()
            }
        }
        _ => String::new(),
    };
    format!("{}{}", uuid::Uuid::new_v4(), ext)
}

/// Names handed back to clients are flat; anything that could address another key is rejected.
pub fn check_object_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        && !name.starts_with('.');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_keep_extension() {
        let n = object_name_for("photos/Cat.JPG");
        assert!(n.ends_with(".jpg"));
        assert_eq!(n.len(), 36 + 4);
        assert_eq!(object_name_for("README").len(), 36);
        assert_eq!(object_name_for(".env").len(), 36);
        assert_ne!(object_name_for("a.png"), object_name_for("a.png"));
    }

    #[test]
    fn object_names_are_flat() {
        assert!(check_object_name("0b8c1f9e-1c55-4e5e-9b7a-0f6a2c1d3e4f.png").is_ok());
        assert!(check_object_name("../etc/passwd").is_err());
        assert!(check_object_name("a/b").is_err());
        assert!(check_object_name("").is_err());
    }
}
