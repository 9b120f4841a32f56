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

//! Merge/ordering engine
//!
//! Combines a live backend listing with the overlay document into the
//! sequence served to callers. The backend listing is authoritative for
//! membership (nothing the backend does not report is ever served, and
//! nothing it does report is ever dropped); the overlay is authoritative
//! for ordering and descriptions, to the extent its entries still match
//! reality.

use crate::overlay::MediaOverlay;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vitrine_storage::RawAsset;

/// A fully merged media asset: backend identity plus overlay description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    /// Backend-stable identifier, unique within the folder.
    pub id: String,
    /// Human-readable file name.
    pub name: String,
    /// Publicly servable URL.
    pub url: String,
    /// Creation time as reported by the backend.
    pub created_at: DateTime<Utc>,
    /// Operator-supplied description, `""` when none has been set.
    pub description: String,
}

/// Merge a backend listing with an overlay document.
///
/// 1. Assets named by `overlay.order` come first, in that order; ids the
///    backend no longer reports are dropped, and a duplicated id only
///    counts its first occurrence.
/// 2. Remaining assets follow, newest `created_at` first.
/// 3. Every asset gets `overlay.descriptions[id]`, defaulting to `""`.
///
/// Deterministic for a given input pair: explicit order wins over recency,
/// and assets never vanish merely because the overlay is stale or missing.
pub fn merge_listing(listing: Vec<RawAsset>, overlay: &MediaOverlay) -> Vec<MediaAsset> {
    let mut by_id: HashMap<String, RawAsset> = listing
        .into_iter()
        .map(|asset| (asset.id.clone(), asset))
        .collect();

    let mut ordered = Vec::with_capacity(by_id.len());
    for id in &overlay.order {
        if let Some(asset) = by_id.remove(id) {
            ordered.push(asset);
        }
    }

    let mut remaining: Vec<RawAsset> = by_id.into_values().collect();
    remaining.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    ordered.extend(remaining);

    ordered
        .into_iter()
        .map(|raw| {
            let description = overlay
                .descriptions
                .get(&raw.id)
                .cloned()
                .unwrap_or_default();
            MediaAsset {
                id: raw.id,
                name: raw.name,
                url: raw.url,
                created_at: raw.created_at,
                description,
            }
        })
        .collect()
}
