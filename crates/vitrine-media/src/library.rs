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

//! The media library: listing plus mutation coordination
//!
//! [`MediaLibrary`] owns the read path (concurrent backend-listing and
//! overlay fetch, then merge) and the mutation paths (upload fan-out,
//! reorder, describe, delete). All mutations are single read-modify-write
//! cycles against the overlay document; there is no lock, so concurrent
//! reorder/describe calls for the same folder race and the last write wins.
//! That matches the low-contention admin-tool use this serves.

use crate::merge::{merge_listing, MediaAsset};
use crate::overlay::OverlayStore;
use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use futures::future::join_all;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vitrine_storage::MediaBackend;

const SETTINGS_BLOB: &str = "settings.json";

/// One file in an upload batch.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name as supplied by the uploader.
    pub name: String,
    /// Mime type of the content.
    pub content_type: String,
    /// Raw file bytes.
    pub data: Bytes,
}

/// Folder-oriented media operations over the active storage backend.
#[derive(Debug, Clone)]
pub struct MediaLibrary {
    backend: Arc<dyn MediaBackend>,
    overlay: OverlayStore,
}

impl MediaLibrary {
    /// Create a library over the given backend.
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        MediaLibrary {
            overlay: OverlayStore::new(Arc::clone(&backend)),
            backend,
        }
    }

    /// List a folder's assets in their merged, user-edited order.
    ///
    /// The backend listing and the overlay are fetched concurrently. A
    /// failed listing degrades to an empty folder (logged) rather than an
    /// error, so one unreachable backend dims the UI instead of breaking it.
    pub async fn list(&self, folder: &str) -> Vec<MediaAsset> {
        let (listing, overlay) = tokio::join!(self.backend.list(folder), self.overlay.read(folder));

        let listing = match listing {
            Ok(items) => items,
            Err(e) => {
                warn!(folder, error = %e, "backend listing failed, serving empty folder");
                Vec::new()
            }
        };

        merge_listing(listing, &overlay)
    }

    /// Upload a batch of files concurrently; returns the new asset ids.
    ///
    /// All uploads run to completion regardless of individual failures (a
    /// bad file does not cancel its siblings mid-flight), but any failure
    /// makes the whole call report an error naming every file that failed.
    pub async fn upload_files(&self, folder: &str, files: Vec<UploadFile>) -> Result<Vec<String>> {
        let uploads = files.into_iter().map(|file| {
            let backend = Arc::clone(&self.backend);
            let folder = folder.to_string();
            async move {
                let UploadFile {
                    name,
                    content_type,
                    data,
                } = file;
                backend
                    .upload(&folder, data, &name, &content_type)
                    .await
                    .with_context(|| format!("upload of {name} failed"))
            }
        });

        let mut ids = Vec::new();
        let mut failures = Vec::new();
        for result in join_all(uploads).await {
            match result {
                Ok(id) => ids.push(id),
                Err(e) => failures.push(format!("{e:#}")),
            }
        }

        if failures.is_empty() {
            debug!(folder, count = ids.len(), "uploaded files");
            Ok(ids)
        } else {
            Err(anyhow!(
                "{} of {} uploads failed: {}",
                failures.len(),
                failures.len() + ids.len(),
                failures.join("; ")
            ))
        }
    }

    /// Replace a folder's manual ordering wholesale.
    ///
    /// The supplied sequence is stored as-is; ids that do not (or no
    /// longer) exist are tolerated and dropped at merge time.
    pub async fn reorder(&self, folder: &str, order: Vec<String>) -> Result<()> {
        let mut overlay = self.overlay.read(folder).await;
        overlay.order = order;
        self.overlay.write(folder, &overlay).await
    }

    /// Shallow-merge description edits into a folder's overlay.
    ///
    /// New ids are added and existing ids overwritten; omitted ids are
    /// left untouched. There is no way to delete an entry, only to blank
    /// it, and blanked entries are indistinguishable from absent ones.
    pub async fn describe(
        &self,
        folder: &str,
        descriptions: BTreeMap<String, String>,
    ) -> Result<()> {
        let mut overlay = self.overlay.read(folder).await;
        overlay.descriptions.extend(descriptions);
        self.overlay.write(folder, &overlay).await
    }

    /// Delete an asset from the backend, then prune it from the overlay.
    ///
    /// The backend delete goes first: if it fails nothing else happens and
    /// the error propagates. If the subsequent overlay cleanup fails the
    /// asset is already gone and only a stale overlay entry remains, which
    /// the merge engine drops on every read, so that failure is logged
    /// and swallowed rather than reported as a delete failure.
    pub async fn delete(&self, folder: &str, id: &str) -> Result<()> {
        self.backend
            .delete(folder, id)
            .await
            .with_context(|| format!("failed to delete {folder}/{id}"))?;

        let mut overlay = self.overlay.read(folder).await;
        overlay.order.retain(|entry| entry != id);
        overlay.descriptions.remove(id);
        if let Err(e) = self.overlay.write(folder, &overlay).await {
            warn!(folder, id, error = %e, "overlay cleanup after delete failed; merge will drop the stale entry");
        }

        debug!(folder, id, "deleted asset");
        Ok(())
    }

    /// Read the application settings blob, or `{}` when absent or
    /// unreadable.
    pub async fn read_settings(&self) -> Value {
        match self.backend.read_blob(SETTINGS_BLOB).await {
            Ok(Some(value)) => value,
            Ok(None) => Value::Object(Default::default()),
            Err(e) => {
                warn!(error = %e, "settings read failed, serving empty settings");
                Value::Object(Default::default())
            }
        }
    }

    /// Replace the application settings blob.
    pub async fn write_settings(&self, value: &Value) -> Result<()> {
        self.backend.write_blob(SETTINGS_BLOB, value).await
    }
}
