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

//! Storage error types and utilities

use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Asset or blob not found in storage
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Folder key or asset id that cannot be mapped onto the backend
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Storage backend unreachable or misbehaving
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Create a NotFound error for the given id
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        StorageError::NotFound(id.into())
    }

    /// Create an InvalidName error with context
    pub fn invalid_name<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidName(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = StorageError::not_found("carousel/abc");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "asset not found: carousel/abc");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::other("read failed");
        let storage_err = StorageError::from(io_err);
        assert!(matches!(storage_err, StorageError::Io(_)));
    }
}
