//! Thin presigned-URL client over S3-compatible object storage.
//!
//! `kibotos-api` is the only process that holds object-store credentials
//! it mints presigned PUT URLs for miners to
//! upload video bytes directly, and presigned GET URLs for workers to
//! download them for evaluation. Nothing in this crate reads or writes
//! object bytes itself.

mod error;

pub use error::ObjectStoreError;

use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use uuid::Uuid;

/// Connection details for an S3-compatible bucket. `endpoint` is set for
/// non-AWS providers (MinIO, R2, ...); leave it `None` to resolve a region
/// against AWS directly.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    pub path_style: bool,
}

#[derive(Clone)]
pub struct ObjectStore {
    bucket: Box<Bucket>,
}

impl ObjectStore {
    pub fn connect(config: &ObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse::<Region>()
                .map_err(ObjectStoreError::S3)?,
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )?;

        let bucket = Bucket::new(&config.bucket, region, credentials)?;
        let bucket = if config.path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(Self { bucket })
    }

    /// Mints a presigned `PUT` URL under a random, collision-free key
    /// namespaced `uploads/{uuid}/{filename}`, valid for `expires_in`
    /// seconds. Returns the URL and the `video_key` the caller should echo
    /// back in the eventual submission.
    pub async fn presign_upload(
        &self,
        filename: &str,
        content_type: &str,
        expires_in: u32,
    ) -> Result<(String, String), ObjectStoreError> {
        let video_key = format!("uploads/{}/{}", Uuid::new_v4(), sanitize_filename(filename));

        let mut headers = std::collections::HashMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());

        let url = self
            .bucket
            .presign_put(&video_key, expires_in, Some(headers), None)
            .await?;

        Ok((url, video_key))
    }

    /// Mints a presigned `GET` URL for an existing `video_key`, valid for
    /// `expires_in` seconds. Used by workers (via the gateway's lease
    /// response) to fetch video bytes for evaluation.
    pub async fn presign_download(
        &self,
        video_key: &str,
        expires_in: u32,
    ) -> Result<String, ObjectStoreError> {
        let url = self.bucket.presign_get(video_key, expires_in, None).await?;
        Ok(url)
    }
}

/// Strips path separators and leading dots so a miner-supplied filename
/// can't escape the `uploads/{uuid}/` prefix or hide behind a dotfile.
fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let trimmed = base.trim_start_matches('.');
    if trimmed.is_empty() {
        "video".to_string()
    } else {
        trimmed.to_string()
    }
}
