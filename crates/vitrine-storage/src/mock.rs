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

//! In-memory mock storage backend for testing
//!
//! Thread-safe implementation of [`MediaBackend`](crate::MediaBackend) over
//! `Arc<RwLock<HashMap>>`, with knobs to seed assets at chosen timestamps
//! and to inject listing, delete, and blob-write failures.

use crate::{validate_component, MediaBackend, RawAsset};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    assets: RwLock<HashMap<String, Vec<RawAsset>>>,
    blobs: RwLock<HashMap<String, serde_json::Value>>,
    fail_listings: AtomicBool,
    fail_deletes: AtomicBool,
    fail_blob_writes: AtomicBool,
    upload_seq: AtomicU64,
}

/// In-memory mock storage backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    inner: Arc<Inner>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an asset with a chosen id and creation time.
    pub async fn seed_asset(&self, folder: &str, id: &str, created_at: DateTime<Utc>) {
        let mut assets = self.inner.assets.write().await;
        assets.entry(folder.to_string()).or_default().push(RawAsset {
            id: id.to_string(),
            name: id.to_string(),
            url: format!("mock://{folder}/{id}"),
            created_at,
        });
    }

    /// Seed a raw blob document.
    pub async fn seed_blob(&self, name: &str, value: serde_json::Value) {
        self.inner.blobs.write().await.insert(name.to_string(), value);
    }

    /// Inspect a stored blob.
    pub async fn blob(&self, name: &str) -> Option<serde_json::Value> {
        self.inner.blobs.read().await.get(name).cloned()
    }

    /// Make every subsequent `list` call fail.
    pub fn fail_listings(&self, fail: bool) {
        self.inner.fail_listings.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `delete` call fail.
    pub fn fail_deletes(&self, fail: bool) {
        self.inner.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `write_blob` call fail.
    pub fn fail_blob_writes(&self, fail: bool) {
        self.inner.fail_blob_writes.store(fail, Ordering::SeqCst);
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend").finish_non_exhaustive()
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn list(&self, folder: &str) -> anyhow::Result<Vec<RawAsset>> {
        validate_component("folder", folder)?;
        if self.inner.fail_listings.load(Ordering::SeqCst) {
            anyhow::bail!("injected listing failure");
        }
        let assets = self.inner.assets.read().await;
        let mut items = assets.get(folder).cloned().unwrap_or_default();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn upload(
        &self,
        folder: &str,
        _data: Bytes,
        name: &str,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        validate_component("folder", folder)?;
        let seq = self.inner.upload_seq.fetch_add(1, Ordering::SeqCst);
        let id = format!("m{seq}-{name}");
        let mut assets = self.inner.assets.write().await;
        assets.entry(folder.to_string()).or_default().push(RawAsset {
            id: id.clone(),
            name: name.to_string(),
            url: format!("mock://{folder}/{id}"),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn delete(&self, folder: &str, id: &str) -> anyhow::Result<()> {
        if self.inner.fail_deletes.load(Ordering::SeqCst) {
            anyhow::bail!("injected delete failure");
        }
        let mut assets = self.inner.assets.write().await;
        let folder_assets = assets
            .get_mut(folder)
            .ok_or_else(|| anyhow::anyhow!("asset not found: {folder}/{id}"))?;
        let before = folder_assets.len();
        folder_assets.retain(|a| a.id != id);
        if folder_assets.len() == before {
            anyhow::bail!("asset not found: {folder}/{id}");
        }
        Ok(())
    }

    async fn read_blob(&self, name: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.inner.blobs.read().await.get(name).cloned())
    }

    async fn write_blob(&self, name: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        if self.inner.fail_blob_writes.load(Ordering::SeqCst) {
            anyhow::bail!("injected blob write failure");
        }
        self.inner
            .blobs
            .write()
            .await
            .insert(name.to_string(), value.clone());
        Ok(())
    }
}
