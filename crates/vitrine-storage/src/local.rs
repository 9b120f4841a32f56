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

//! Local filesystem storage backend
//!
//! Implements the `MediaBackend` trait on top of two directories:
//!
//! ```text
//! public/
//!   uploads/
//!     carousel/        uploaded assets for the "carousel" folder
//!     gallery/         uploaded assets for the "gallery" folder
//!   carousel/          legacy fallback location (read-only)
//! data/
//!   carousel.meta.json JSON blobs (overlay documents, app settings)
//!   settings.json
//! ```
//!
//! Assets live under `public/uploads/<folder>/` and are addressed by file
//! name; the file name is the asset id. When the primary directory holds no
//! images, `public/<folder>/` is consulted as a back-compat fallback so
//! pre-existing installs keep rendering without a migration.
//!
//! Writes are atomic: data goes to a `.tmp` sibling first and is renamed
//! into place, so a crash mid-write never leaves a half-visible asset or a
//! truncated blob. `created_at` is taken from the file modification time,
//! which for create-once-never-mutate assets equals the upload time.

use crate::{is_image_name, namer, validate_component, MediaBackend, RawAsset, StorageError};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

// Everything encodeURIComponent would escape, i.e. all of NON_ALPHANUMERIC
// minus the characters it leaves alone.
const URL_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Local filesystem storage backend
///
/// # Thread safety
///
/// `Send + Sync` and cheap to clone; the filesystem provides natural
/// synchronization for concurrent access, and assets are only ever created
/// or deleted, never rewritten.
#[derive(Clone)]
pub struct LocalBackend {
    public_dir: PathBuf,
    data_dir: PathBuf,
}

impl LocalBackend {
    /// Create a new local backend.
    ///
    /// `public_dir` is the web-servable root (uploads land under
    /// `public_dir/uploads/<folder>`); `data_dir` holds the JSON blobs.
    /// Both directories are created if absent.
    pub async fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        public_dir: P,
        data_dir: Q,
    ) -> anyhow::Result<Self> {
        let public_dir = public_dir.as_ref().to_path_buf();
        let data_dir = data_dir.as_ref().to_path_buf();

        for dir in [&public_dir, &data_dir] {
            if !dir.exists() {
                fs::create_dir_all(dir).await?;
            } else if !dir.is_dir() {
                anyhow::bail!("path exists but is not a directory: {}", dir.display());
            }
        }
        fs::create_dir_all(public_dir.join("uploads")).await?;

        Ok(LocalBackend {
            public_dir,
            data_dir,
        })
    }

    /// The web-servable root directory.
    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    fn uploads_dir(&self, folder: &str) -> PathBuf {
        self.public_dir.join("uploads").join(folder)
    }

    fn fallback_dir(&self, folder: &str) -> PathBuf {
        self.public_dir.join(folder)
    }

    fn blob_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Write data to `path` atomically via a temp file and rename.
    async fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = path.with_extension("tmp");
        let _ = fs::remove_file(&temp_path).await;

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, path).await?;
        Ok(())
    }

    /// Collect the image files of `dir` as assets, with URLs rooted at
    /// `url_prefix`. A missing directory yields an empty vec.
    async fn scan_dir(dir: &Path, url_prefix: &str) -> anyhow::Result<Vec<RawAsset>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_image_name(&name) {
                continue;
            }
            let created_at: DateTime<Utc> = metadata
                .modified()
                .map(DateTime::from)
                .unwrap_or_else(|_| Utc::now());
            let encoded = utf8_percent_encode(&name, URL_SEGMENT).to_string();
            assets.push(RawAsset {
                id: name.clone(),
                name,
                url: format!("{url_prefix}/{encoded}"),
                created_at,
            });
        }

        // Deterministic listing; the merge engine owns the real ordering.
        assets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(assets)
    }
}

impl fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBackend")
            .field("public_dir", &self.public_dir)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

#[async_trait]
impl MediaBackend for LocalBackend {
    async fn list(&self, folder: &str) -> anyhow::Result<Vec<RawAsset>> {
        validate_component("folder", folder)?;

        let primary = Self::scan_dir(&self.uploads_dir(folder), &format!("/uploads/{folder}"))
            .await?;
        if !primary.is_empty() {
            return Ok(primary);
        }

        // Back-compat: installs that predate the uploads/ layout keep their
        // images directly under public/<folder>.
        Self::scan_dir(&self.fallback_dir(folder), &format!("/{folder}")).await
    }

    async fn upload(
        &self,
        folder: &str,
        data: Bytes,
        name: &str,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        validate_component("folder", folder)?;

        let dir = self.uploads_dir(folder);
        fs::create_dir_all(&dir).await?;

        // unique_name makes collisions vanishingly rare; the existence check
        // covers a seeded directory that happens to contain the same name.
        loop {
            let stored_name = namer::unique_name(name);
            let path = dir.join(&stored_name);
            if fs::try_exists(&path).await? {
                continue;
            }
            Self::write_atomic(&path, &data).await?;
            tracing::debug!(folder, name = %stored_name, bytes = data.len(), "stored local asset");
            return Ok(stored_name);
        }
    }

    async fn delete(&self, folder: &str, id: &str) -> anyhow::Result<()> {
        validate_component("folder", folder)?;
        validate_component("id", id)?;

        let path = self.uploads_dir(folder).join(id);
        match fs::remove_file(&path).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        // The asset may live in the fallback directory.
        let fallback = self.fallback_dir(folder).join(id);
        match fs::remove_file(&fallback).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(format!("{folder}/{id}")).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn read_blob(&self, name: &str) -> anyhow::Result<Option<serde_json::Value>> {
        validate_component("blob name", name)?;

        match fs::read(self.blob_path(name)).await {
            Ok(raw) => {
                let value = serde_json::from_slice(&raw)
                    .map_err(|e| anyhow::anyhow!("blob {name} is not valid JSON: {e}"))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_blob(&self, name: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        validate_component("blob name", name)?;

        let body = serde_json::to_vec_pretty(value)?;
        Self::write_atomic(&self.blob_path(name), &body).await
    }
}
