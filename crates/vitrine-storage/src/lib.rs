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

//! Storage abstraction layer for Vitrine
//!
//! This crate provides a unified, asynchronous media storage interface with
//! three production backends:
//! - Local filesystem ([`LocalBackend`])
//! - S3-compatible object store fronted by a CDN ([`ObjectStoreBackend`])
//! - Google Drive ([`DriveBackend`])
//!
//! # Architecture
//!
//! The [`MediaBackend`] trait defines the complete capability set the rest of
//! the application is allowed to use: list the assets of a folder, upload raw
//! bytes, delete an asset by id, and read/write named JSON blobs. The blob
//! channel carries the per-folder ordering/description overlay as well as
//! unrelated application settings, so every backend must provide it.
//!
//! ## Core concepts
//!
//! - **Folder**: a logical grouping of assets (`carousel`, `gallery`, ...).
//!   Each backend maps a folder key onto its own layout: a subdirectory, a
//!   bucket prefix, or a Drive folder id.
//! - **Asset id**: backend-assigned, stable, and unique within its folder.
//!   For the local backend the id is the stored file name; for the object
//!   store it is the full object key; for Drive it is the file id.
//! - **Blob**: a named JSON document stored next to the assets.
//!
//! # Error semantics
//!
//! Adapters report errors honestly through `anyhow::Result`; they do not
//! swallow failures. The read-side fail-soft policy (an unreachable backend
//! renders as an empty folder) lives one layer up in the merge engine, which
//! keeps degradation behavior identical across all backends.
//!
//! `read_blob` returns `Ok(None)` for an absent blob; absence is not an
//! error. `delete` propagates failure, including deleting an unknown id.
//!
//! # Examples
//!
//! Using the mock backend for testing:
//!
//! ```no_run
//! use vitrine_storage::{MediaBackend, mock::MockBackend};
//! use bytes::Bytes;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = MockBackend::new();
//!
//!     let id = storage
//!         .upload("gallery", Bytes::from_static(b"png bytes"), "sunset.png", "image/png")
//!         .await?;
//!
//!     let assets = storage.list("gallery").await?;
//!     assert_eq!(assets.len(), 1);
//!
//!     storage.delete("gallery", &id).await?;
//!     Ok(())
//! }
//! ```

pub mod drive;
pub mod error;
pub mod local;
pub mod mock;
pub mod namer;
pub mod object_store;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use drive::DriveBackend;
pub use error::{StorageError, StorageResult};
pub use local::LocalBackend;
pub use object_store::ObjectStoreBackend;

/// File extensions accepted as media assets, lower case, without the dot.
///
/// Listings only surface files with these extensions; anything else placed
/// in an asset folder (sidecar metadata, stray uploads) is ignored.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif", "svg"];

/// Check whether a file name carries one of the accepted image extensions.
pub fn is_image_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// A single asset as reported by a backend listing.
///
/// This is the backend half of the asset model; the user-facing description
/// is attached later from the per-folder overlay document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAsset {
    /// Backend-stable identifier, unique within the folder. Never changes
    /// for the lifetime of the asset.
    pub id: String,
    /// Human-readable file name.
    pub name: String,
    /// Publicly servable URL for the binary.
    pub url: String,
    /// Creation time as reported by the backend.
    pub created_at: DateTime<Utc>,
}

/// Media storage backend trait.
///
/// The four asset operations plus the generic JSON blob channel form the
/// complete contract between the storage layer and the rest of the
/// application. Implementations must be `Send + Sync + Debug` and safe for
/// concurrent use; the active backend is chosen once at startup by the
/// adapter factory and shared behind an `Arc<dyn MediaBackend>`.
#[async_trait]
pub trait MediaBackend: Send + Sync + Debug {
    /// List the assets of a folder.
    ///
    /// Returns one [`RawAsset`] per media file currently present. An empty
    /// folder (including one that does not exist yet) yields an empty vec,
    /// not an error. Errors are reserved for the backend being unreachable
    /// or misbehaving.
    async fn list(&self, folder: &str) -> anyhow::Result<Vec<RawAsset>>;

    /// Upload raw bytes as a new asset and return its id.
    ///
    /// Must never silently overwrite an existing asset. Backends that assign
    /// their own ids (Drive) rely on the backend's uniqueness guarantee;
    /// name-addressed backends derive a collision-free name via
    /// [`namer::unique_name`].
    async fn upload(
        &self,
        folder: &str,
        data: Bytes,
        name: &str,
        content_type: &str,
    ) -> anyhow::Result<String>;

    /// Delete an asset by id.
    ///
    /// Fails hard: callers must not assume deletion succeeded when this
    /// returns an error, and deleting an unknown id is an error.
    async fn delete(&self, folder: &str, id: &str) -> anyhow::Result<()>;

    /// Read a named JSON blob, or `Ok(None)` when it does not exist.
    async fn read_blob(&self, name: &str) -> anyhow::Result<Option<serde_json::Value>>;

    /// Write a named JSON blob, creating or replacing it.
    async fn write_blob(&self, name: &str, value: &serde_json::Value) -> anyhow::Result<()>;
}

/// Reject folder keys and asset ids that could escape the backend location.
///
/// Folder keys and local asset ids become path components on disk, so path
/// separators and parent references are refused outright. Failures carry a
/// [`StorageError::InvalidName`] so callers can tell a bad name from a
/// backend fault.
pub(crate) fn validate_component(kind: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        return Err(StorageError::invalid_name(format!("{kind} cannot be empty")).into());
    }
    if value.contains('/') || value.contains('\\') || value == "." || value == ".." {
        return Err(StorageError::invalid_name(format!("invalid {kind}: {value}")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_is_object_safe() {
        fn _check_object_safe(_: &dyn MediaBackend) {}
    }

    #[test]
    fn image_names_are_recognized() {
        assert!(is_image_name("photo.jpg"));
        assert!(is_image_name("PHOTO.JPG"));
        assert!(is_image_name("a.b.webp"));
        assert!(!is_image_name("notes.txt"));
        assert!(!is_image_name("noextension"));
        assert!(!is_image_name("archive.tar.gz"));
    }

    #[test]
    fn components_are_validated() {
        assert!(validate_component("folder", "gallery").is_ok());
        assert!(validate_component("folder", "").is_err());
        assert!(validate_component("folder", "a/b").is_err());
        assert!(validate_component("id", "..").is_err());
        assert!(validate_component("id", "back\\slash").is_err());
    }

    #[test]
    fn rejected_components_carry_invalid_name() {
        let err = validate_component("folder", "a/b").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StorageError>(),
            Some(StorageError::InvalidName(_))
        ));
    }
}
