//! In-process object storage for tests and single-node setups; URLs point at a configured base.

use super::{check_object_name, object_name_for, ObjectStorage, UrlOptions};
use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Process-local object storage for tests and single-node development.
pub struct MemoryObjectStorage {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStorage {
    /// `base_url` prefixes every URL handed out, e.g. `http://127.0.0.1:3000/objects`.
    pub fn new(base_url: impl Into<String>) -> Self {
        MemoryObjectStorage {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn store(&self, data: Vec<u8>, filename: &str, _content_type: Option<&str>) -> Result<String, StorageError> {
        let name = object_name_for(filename);
        self.objects
            .write()
            .map_err(|_| StorageError::Backend("lock poisoned".into()))?
            .insert(name.clone(), data);
        Ok(name)
    }

    async fn retrieve(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        check_object_name(name)?;
        self.objects
            .read()
            .map_err(|_| StorageError::Backend("lock poisoned".into()))?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn url_for(&self, name: &str, options: UrlOptions) -> Result<String, StorageError> {
        check_object_name(name)?;
        if !self
            .objects
            .read()
            .map_err(|_| StorageError::Backend("lock poisoned".into()))?
            .contains_key(name)
        {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let url = format!("{}/{}", self.base_url, name);
        Ok(if options.presigned {
            format!("{}?expires_in={}", url, options.expiry.as_secs())
        } else {
            url
        })
    }
}
