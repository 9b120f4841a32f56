// Vitrine - Media Library Service
// Copyright (C) 2025 Vitrine Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! S3-compatible object store backend (CDN-fronted)
//!
//! Maps folders onto key prefixes inside one bucket:
//!
//! ```text
//! <bucket>/
//!   carousel/1735689600000_k3v9qz_photo.jpg   assets (id = full key)
//!   gallery/...
//!   data/carousel.meta.json                    JSON blobs
//!   data/settings.json
//! ```
//!
//! Public URLs are built from a configured CDN base URL joined with the
//! object key, so the bucket itself never serves traffic directly.
//! `created_at` comes from the object's `LastModified`, which for
//! write-once assets equals the upload time.
//!
//! Credentials and region come from the AWS SDK credential chain
//! (environment, IAM role, profile). A custom `endpoint` supports
//! S3-compatible services (MinIO, DigitalOcean Spaces, Cloudflare R2).
//! Bucket access is verified at construction, not per call.

use crate::{is_image_name, namer, validate_component, MediaBackend, RawAsset};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use tracing::debug;

const BLOB_PREFIX: &str = "data/";

/// Configuration for the object store backend
#[derive(Clone, Debug)]
pub struct ObjectStoreConfig {
    /// Bucket name
    pub bucket: String,
    /// Optional custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    /// Base URL of the CDN serving the bucket, without trailing slash
    /// (e.g. `https://cdn.example.com`)
    pub public_base_url: String,
}

/// S3-compatible object store backend
#[derive(Clone)]
pub struct ObjectStoreBackend {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl ObjectStoreBackend {
    /// Create a new backend and verify bucket access.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        if config.bucket.is_empty() {
            anyhow::bail!("bucket cannot be empty");
        }
        if config.public_base_url.is_empty() {
            anyhow::bail!("public_base_url cannot be empty");
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let client = if let Some(endpoint) = &config.endpoint {
            debug!("Using custom object store endpoint: {}", endpoint);
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint.clone())
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        client
            .head_bucket()
            .bucket(&config.bucket)
            .send()
            .await
            .with_context(|| format!("failed to verify bucket access: {}", config.bucket))?;

        Ok(ObjectStoreBackend {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    fn blob_key(name: &str) -> String {
        format!("{BLOB_PREFIX}{name}")
    }
}

impl fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("bucket", &self.bucket)
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

#[async_trait]
impl MediaBackend for ObjectStoreBackend {
    async fn list(&self, folder: &str) -> Result<Vec<RawAsset>> {
        validate_component("folder", folder)?;

        let prefix = format!("{folder}/");
        let mut assets = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix);
            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| anyhow!("failed to list objects under {prefix}: {e}"))?;

            for obj in response.contents() {
                let Some(key) = obj.key() else { continue };
                let name = key.rsplit('/').next().unwrap_or(key).to_string();
                if !is_image_name(&name) {
                    continue;
                }
                let created_at = obj
                    .last_modified()
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or(DateTime::UNIX_EPOCH);
                assets.push(RawAsset {
                    id: key.to_string(),
                    name,
                    url: self.public_url(key),
                    created_at,
                });
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(|t| t.to_string());
            } else {
                break;
            }
        }

        assets.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(folder, count = assets.len(), "listed object store assets");
        Ok(assets)
    }

    async fn upload(
        &self,
        folder: &str,
        data: Bytes,
        name: &str,
        content_type: &str,
    ) -> Result<String> {
        validate_component("folder", folder)?;

        // The namer's epoch-millis + token prefix gives every upload its own
        // key, so existing objects are never overwritten.
        let key = format!("{folder}/{}", namer::unique_name(name));
        let len = data.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| anyhow!("failed to upload {key}: {e}"))?;

        debug!(key = %key, bytes = len, "uploaded object");
        Ok(key)
    }

    async fn delete(&self, folder: &str, id: &str) -> Result<()> {
        validate_component("folder", folder)?;
        if !id.starts_with(&format!("{folder}/")) {
            anyhow::bail!("asset id {id} does not belong to folder {folder}");
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(id)
            .send()
            .await
            .map_err(|e| anyhow!("failed to delete {id}: {e}"))?;

        debug!(id, "deleted object");
        Ok(())
    }

    async fn read_blob(&self, name: &str) -> Result<Option<serde_json::Value>> {
        validate_component("blob name", name)?;

        let key = Self::blob_key(name);
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(anyhow!("failed to read blob {key}: {service_err}"));
            }
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("failed to read blob body {key}: {e}"))?;
        let value = serde_json::from_slice(&body.into_bytes())
            .map_err(|e| anyhow!("blob {key} is not valid JSON: {e}"))?;
        Ok(Some(value))
    }

    async fn write_blob(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        validate_component("blob name", name)?;

        let key = Self::blob_key(name);
        let body = serde_json::to_vec_pretty(value)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| anyhow!("failed to write blob {key}: {e}"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_keys_live_under_data_prefix() {
        assert_eq!(
            ObjectStoreBackend::blob_key("carousel.meta.json"),
            "data/carousel.meta.json"
        );
    }

    #[test]
    fn config_is_debuggable() {
        let config = ObjectStoreConfig {
            bucket: "media".into(),
            endpoint: None,
            public_base_url: "https://cdn.example.com".into(),
        };
        assert!(format!("{config:?}").contains("cdn.example.com"));
    }
}
