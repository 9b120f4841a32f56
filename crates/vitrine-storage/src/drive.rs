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

//! Google Drive storage backend
//!
//! Talks to the Drive v3 REST API via `reqwest` with a bearer token. Each
//! folder key maps to a Drive folder id through configuration; Drive itself
//! assigns the asset ids, so no upload namer is involved. JSON blobs are
//! sidecar files inside a dedicated data folder, located by exact name.
//!
//! Uploads are two-step: a metadata-only `files.create` pins the name and
//! parent, then a `uploadType=media` PATCH fills in the content. When the
//! PATCH fails the created file is deleted best-effort, so a failed upload
//! does not leave a zero-byte orphan behind. Listing
//! requests only image mime types and excludes trashed files. Asset URLs use
//! the `uc?export=view` form, which serves the binary for files shared
//! publicly.
//!
//! Drive-specific features (permissions, revisions, shared drives) are out
//! of scope.

use crate::{MediaBackend, RawAsset};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, warn};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const DEFAULT_UPLOAD_BASE: &str = "https://www.googleapis.com/upload";

/// Configuration for the Drive backend
#[derive(Clone)]
pub struct DriveConfig {
    /// OAuth bearer token for a service account with access to the folders
    pub token: String,
    /// Folder key (e.g. `carousel`) to Drive folder id
    pub folders: HashMap<String, String>,
    /// Drive folder id holding the JSON blobs
    pub data_folder_id: String,
    /// API base URL, overridable for tests
    pub api_base: String,
    /// Upload base URL, overridable for tests
    pub upload_base: String,
}

impl DriveConfig {
    /// Build a config with the production API endpoints.
    pub fn new(
        token: impl Into<String>,
        folders: HashMap<String, String>,
        data_folder_id: impl Into<String>,
    ) -> Self {
        DriveConfig {
            token: token.into(),
            folders,
            data_folder_id: data_folder_id.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
        }
    }
}

impl fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveConfig")
            .field("token", &"<redacted>")
            .field("folders", &self.folders)
            .field("data_folder_id", &self.data_folder_id)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "createdTime")]
    created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Google Drive storage backend
#[derive(Clone)]
pub struct DriveBackend {
    http: reqwest::Client,
    config: DriveConfig,
}

impl DriveBackend {
    /// Create a new Drive backend.
    ///
    /// Validates the configuration up front; credential problems against
    /// the live API surface as request errors later.
    pub fn new(config: DriveConfig) -> Result<Self> {
        if config.token.is_empty() {
            anyhow::bail!("drive token cannot be empty");
        }
        if config.folders.is_empty() {
            anyhow::bail!("no drive folder mappings configured");
        }
        if config.data_folder_id.is_empty() {
            anyhow::bail!("drive data folder id cannot be empty");
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build drive http client")?;

        Ok(DriveBackend { http, config })
    }

    fn folder_id(&self, folder: &str) -> Result<&str> {
        self.config
            .folders
            .get(folder)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("no drive folder configured for {folder}"))
    }

    async fn files_query(&self, q: &str, fields: &str) -> Result<Vec<DriveFile>> {
        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.config.api_base))
            .bearer_auth(&self.config.token)
            .query(&[("q", q), ("fields", fields), ("pageSize", "1000")])
            .send()
            .await
            .context("drive files.list request failed")?
            .error_for_status()
            .context("drive files.list returned an error")?;

        let list: DriveFileList = response
            .json()
            .await
            .context("drive files.list response is not valid JSON")?;
        Ok(list.files)
    }

    /// Create an empty file with the given name and parent, returning its id.
    async fn create_file(&self, name: &str, parent: &str) -> Result<String> {
        let metadata = serde_json::json!({ "name": name, "parents": [parent] });
        let created: DriveFile = self
            .http
            .post(format!("{}/drive/v3/files", self.config.api_base))
            .bearer_auth(&self.config.token)
            .query(&[("fields", "id,name")])
            .json(&metadata)
            .send()
            .await
            .context("drive files.create request failed")?
            .error_for_status()
            .context("drive files.create returned an error")?
            .json()
            .await
            .context("drive files.create response is not valid JSON")?;
        Ok(created.id)
    }

    /// Replace the content of an existing file.
    async fn upload_content(&self, id: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.http
            .patch(format!(
                "{}/drive/v3/files/{id}?uploadType=media",
                self.config.upload_base
            ))
            .bearer_auth(&self.config.token)
            .header(reqwest::header::CONTENT_TYPE, content_type.to_string())
            .body(data)
            .send()
            .await
            .context("drive media upload request failed")?
            .error_for_status()
            .context("drive media upload returned an error")?;
        Ok(())
    }

    /// Delete a file by id.
    async fn delete_file(&self, id: &str) -> Result<()> {
        self.http
            .delete(format!("{}/drive/v3/files/{id}", self.config.api_base))
            .bearer_auth(&self.config.token)
            .send()
            .await
            .context("drive delete request failed")?
            .error_for_status()
            .context("drive delete returned an error")?;
        Ok(())
    }

    /// Find a blob file by exact name inside the data folder.
    async fn find_blob(&self, name: &str) -> Result<Option<String>> {
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        let q = format!(
            "name = '{escaped}' and '{}' in parents and trashed = false",
            self.config.data_folder_id
        );
        let files = self.files_query(&q, "files(id,name)").await?;
        Ok(files.into_iter().next().map(|f| f.id))
    }
}

impl fmt::Debug for DriveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveBackend")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl MediaBackend for DriveBackend {
    async fn list(&self, folder: &str) -> Result<Vec<RawAsset>> {
        let folder_id = self.folder_id(folder)?;
        let q = format!(
            "'{folder_id}' in parents and mimeType contains 'image/' and trashed = false"
        );
        let files = self
            .files_query(&q, "files(id,name,createdTime)")
            .await
            .with_context(|| format!("failed to list drive folder {folder}"))?;

        let mut assets: Vec<RawAsset> = files
            .into_iter()
            .map(|f| RawAsset {
                url: format!("https://drive.google.com/uc?export=view&id={}", f.id),
                created_at: f.created_time.unwrap_or(DateTime::UNIX_EPOCH),
                id: f.id,
                name: f.name,
            })
            .collect();

        assets.sort_by(|a, b| a.id.cmp(&b.id));
        debug!(folder, count = assets.len(), "listed drive assets");
        Ok(assets)
    }

    async fn upload(
        &self,
        folder: &str,
        data: Bytes,
        name: &str,
        content_type: &str,
    ) -> Result<String> {
        let folder_id = self.folder_id(folder)?.to_string();

        // Drive guarantees a unique id per created file even when names
        // collide, so the original name is kept as-is.
        let id = self.create_file(name, &folder_id).await?;
        if let Err(e) = self.upload_content(&id, data, content_type).await {
            // Best-effort: remove the metadata-only file so a failed upload
            // does not leave a zero-byte orphan in the folder.
            if let Err(cleanup) = self.delete_file(&id).await {
                warn!(id = %id, error = %cleanup, "failed to remove orphaned drive file");
            }
            return Err(e).with_context(|| format!("failed to upload content for {name}"));
        }

        debug!(folder, id = %id, "uploaded drive asset");
        Ok(id)
    }

    async fn delete(&self, folder: &str, id: &str) -> Result<()> {
        // Drive ids are globally unique; the folder key is only kept for
        // operator context in the error.
        self.delete_file(id)
            .await
            .with_context(|| format!("failed to delete drive asset {folder}/{id}"))
    }

    async fn read_blob(&self, name: &str) -> Result<Option<serde_json::Value>> {
        let Some(id) = self.find_blob(name).await? else {
            return Ok(None);
        };

        let value = self
            .http
            .get(format!("{}/drive/v3/files/{id}", self.config.api_base))
            .bearer_auth(&self.config.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .context("drive blob download request failed")?
            .error_for_status()
            .with_context(|| format!("failed to download blob {name}"))?
            .json()
            .await
            .map_err(|e| anyhow!("blob {name} is not valid JSON: {e}"))?;
        Ok(Some(value))
    }

    async fn write_blob(&self, name: &str, value: &serde_json::Value) -> Result<()> {
        let id = match self.find_blob(name).await? {
            Some(id) => id,
            None => self.create_file(name, &self.config.data_folder_id).await?,
        };

        let body = serde_json::to_vec_pretty(value)?;
        self.upload_content(&id, Bytes::from(body), "application/json")
            .await
            .with_context(|| format!("failed to write blob {name}"))
    }
}
