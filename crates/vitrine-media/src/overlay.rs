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

//! Per-folder ordering/description overlay
//!
//! The overlay is the only backend-independent state in the system: a JSON
//! document named `<folder>.meta.json` carrying the manual ordering and the
//! asset descriptions. It is created lazily (reading a folder that has
//! never been curated yields the zero value) and it tolerates drift:
//! entries for assets the backend no longer reports are harmless, and an
//! unreadable or malformed document degrades to empty rather than blocking
//! the listing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;
use vitrine_storage::MediaBackend;

/// The per-folder overlay document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaOverlay {
    /// Asset ids in the operator's chosen order. May reference ids that no
    /// longer exist; those are dropped at merge time.
    #[serde(default)]
    pub order: Vec<String>,
    /// Asset id to description text. Sparse; absent ids read as `""`.
    #[serde(default)]
    pub descriptions: BTreeMap<String, String>,
}

/// Reads and writes overlay documents through the active backend's blob
/// channel.
#[derive(Debug, Clone)]
pub struct OverlayStore {
    backend: Arc<dyn MediaBackend>,
}

impl OverlayStore {
    /// Create a store over the given backend.
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        OverlayStore { backend }
    }

    fn meta_key(folder: &str) -> String {
        format!("{folder}.meta.json")
    }

    /// Read the overlay for a folder.
    ///
    /// Absent, unreadable, and malformed documents all come back as the
    /// zero value; corruption is logged but never fatal.
    pub async fn read(&self, folder: &str) -> MediaOverlay {
        match self.backend.read_blob(&Self::meta_key(folder)).await {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(overlay) => overlay,
                Err(e) => {
                    warn!(folder, error = %e, "overlay document is malformed, treating as empty");
                    MediaOverlay::default()
                }
            },
            Ok(None) => MediaOverlay::default(),
            Err(e) => {
                warn!(folder, error = %e, "overlay read failed, treating as empty");
                MediaOverlay::default()
            }
        }
    }

    /// Persist the overlay for a folder, replacing the stored document.
    pub async fn write(&self, folder: &str, overlay: &MediaOverlay) -> anyhow::Result<()> {
        let value = serde_json::to_value(overlay)?;
        self.backend.write_blob(&Self::meta_key(folder), &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitrine_storage::mock::MockBackend;

    fn store(backend: &MockBackend) -> OverlayStore {
        OverlayStore::new(Arc::new(backend.clone()))
    }

    #[tokio::test]
    async fn absent_overlay_reads_as_zero_value() {
        let backend = MockBackend::new();
        let overlay = store(&backend).read("carousel").await;
        assert_eq!(overlay, MediaOverlay::default());
    }

    #[tokio::test]
    async fn roundtrip_preserves_content() {
        let backend = MockBackend::new();
        let s = store(&backend);

        let mut overlay = MediaOverlay::default();
        overlay.order = vec!["b".into(), "a".into()];
        overlay.descriptions.insert("a".into(), "first".into());

        s.write("carousel", &overlay).await.unwrap();
        assert_eq!(s.read("carousel").await, overlay);

        // Stored under the folder-scoped key.
        assert!(backend.blob("carousel.meta.json").await.is_some());
        assert!(backend.blob("gallery.meta.json").await.is_none());
    }

    #[tokio::test]
    async fn malformed_overlay_reads_as_zero_value() {
        let backend = MockBackend::new();
        backend
            .seed_blob("carousel.meta.json", json!("this is not an overlay"))
            .await;
        let overlay = store(&backend).read("carousel").await;
        assert_eq!(overlay, MediaOverlay::default());
    }

    #[tokio::test]
    async fn partial_document_fills_defaults() {
        let backend = MockBackend::new();
        backend
            .seed_blob("carousel.meta.json", json!({"order": ["x"]}))
            .await;
        let overlay = store(&backend).read("carousel").await;
        assert_eq!(overlay.order, vec!["x".to_string()]);
        assert!(overlay.descriptions.is_empty());
    }

    #[tokio::test]
    async fn write_failure_propagates() {
        let backend = MockBackend::new();
        backend.fail_blob_writes(true);
        let result = store(&backend).write("carousel", &MediaOverlay::default()).await;
        assert!(result.is_err());
    }
}
