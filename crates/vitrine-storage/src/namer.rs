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

//! Collision-free upload names for name-addressed backends
//!
//! The local and object-store backends address assets by file name / object
//! key, so the uploaded name must be unique without scanning the target
//! directory first. [`unique_name`] prefixes the sanitized original name
//! with the current epoch milliseconds and a short random token:
//!
//! ```text
//! 1735689600000_k3v9qz_my_photo.jpg
//! ```
//!
//! Drive assigns its own ids and does not go through this module.

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};

const TOKEN_LEN: usize = 6;

/// Replace every run of characters outside `[A-Za-z0-9_.-]` with a single
/// underscore.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_replacement = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
            out.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            out.push('_');
            last_was_replacement = true;
        }
    }
    out
}

/// Derive a unique storage name for an uploaded file.
///
/// The epoch-millisecond prefix keeps names roughly sortable by upload time;
/// the random token disambiguates uploads landing in the same millisecond.
pub fn unique_name(original: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}_{}_{}",
        Utc::now().timestamp_millis(),
        token.to_ascii_lowercase(),
        sanitize_name(original)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_name("photo-1_final.v2.jpg"), "photo-1_final.v2.jpg");
    }

    #[test]
    fn sanitize_collapses_runs() {
        assert_eq!(sanitize_name("my photo (1).jpg"), "my_photo_1_.jpg");
        assert_eq!(sanitize_name("été à paris.png"), "_t_paris.png");
    }

    #[test]
    fn sanitize_handles_unicode() {
        assert_eq!(sanitize_name("日本語.jpg"), "_.jpg");
    }

    #[test]
    fn unique_names_differ() {
        let a = unique_name("a.png");
        let b = unique_name("a.png");
        assert_ne!(a, b);
        assert!(a.ends_with("_a.png"));
    }

    #[test]
    fn unique_name_has_three_sections() {
        let name = unique_name("x.jpg");
        let mut parts = name.splitn(3, '_');
        let millis: i64 = parts.next().unwrap().parse().unwrap();
        assert!(millis > 0);
        assert_eq!(parts.next().unwrap().len(), TOKEN_LEN);
        assert_eq!(parts.next().unwrap(), "x.jpg");
    }
}
