//! Product image storage backed by object_store (S3/MinIO/GCS/Azure/local
//! filesystem, selected by URL scheme).

use std::sync::Arc;

use bytes::Bytes;
use object_store::path::Path;
use object_store::ObjectStore;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Clone)]
pub struct BlobStore {
    store: Arc<dyn ObjectStore>,
    prefix: Path,
}

impl BlobStore {
    /// Build from a store URL, e.g. `s3://shelfsense-images` or
    /// `file:///var/lib/shelfsense/images`. Cloud credentials come from the
    /// environment the way the backing crate expects them.
    pub fn from_url(store_url: &str) -> Result<Self, AppError> {
        let url = url::Url::parse(store_url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid blob store URL: {}", e)))?;
        let (store, prefix) = object_store::parse_url(&url)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("blob store setup failed: {}", e)))?;
        Ok(Self {
            store: Arc::from(store),
            prefix,
        })
    }

    /// Store a product image and return its object path for persistence on
    /// the product row.
    pub async fn put_image(
        &self,
        product_id: i32,
        extension: &str,
        data: Bytes,
    ) -> Result<String, AppError> {
        let object_path = self.prefix.child("products").child(format!(
            "{}-{}.{}",
            product_id,
            Uuid::new_v4().simple(),
            extension
        ));

        self.store
            .put(&object_path, data.into())
            .await
            .map_err(|e| AppError::Transport(format!("image upload failed: {}", e)))?;

        Ok(object_path.to_string())
    }
}
