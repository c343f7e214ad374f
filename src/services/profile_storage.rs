// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile image storage on local disk.
//!
//! Files are written under the configured directory with a random name and
//! served back by the static `/public` route.

use crate::error::AppError;
use std::path::{Path, PathBuf};

/// Largest accepted upload.
pub const MAX_PROFILE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

#[derive(Clone)]
pub struct ProfileStorage {
    dir: PathBuf,
}

impl ProfileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an uploaded image and return its stored file name.
    pub async fn store(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        let extension = allowed_extension(original_name)?;
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }
        if bytes.len() > MAX_PROFILE_BYTES {
            return Err(AppError::Validation(format!(
                "File exceeds {} bytes",
                MAX_PROFILE_BYTES
            )));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("create profile dir: {}", e)))?;

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&file_name), bytes)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("write profile image: {}", e)))?;

        Ok(file_name)
    }

    /// Delete a previously stored image.
    pub async fn remove(&self, file_name: &str) -> std::io::Result<()> {
        // Stored names never contain separators; refuse anything that does.
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "refusing to remove path outside profile directory",
            ));
        }
        tokio::fs::remove_file(self.dir.join(file_name)).await
    }
}

/// Lower-cased extension of `name` if it is an accepted image type.
fn allowed_extension(name: &str) -> Result<String, AppError> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| AppError::Validation("File has no extension".to_string()))?;

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(AppError::Validation(format!(
            "Unsupported file type '.{}'",
            extension
        )))
    }
}
