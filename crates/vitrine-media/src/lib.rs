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

//! Media folder semantics for Vitrine
//!
//! Sits between the HTTP surface and the storage backends. Three pieces:
//!
//! - [`overlay`]: the per-folder `{order, descriptions}` JSON document,
//!   persisted through the active backend's blob channel.
//! - [`merge`]: the pure function combining a live backend listing with the
//!   overlay into the served asset sequence.
//! - [`library`]: [`MediaLibrary`], the mutation coordinator: concurrent
//!   upload fan-out, reorder, describe, and backend-then-overlay delete.
//!
//! There is no cached merged state anywhere: every list call re-derives the
//! sequence from the backend listing and the overlay, which is what lets a
//! stale overlay self-heal instead of wedging the folder.

pub mod library;
pub mod merge;
pub mod overlay;

pub use library::{MediaLibrary, UploadFile};
pub use merge::{merge_listing, MediaAsset};
pub use overlay::{MediaOverlay, OverlayStore};
