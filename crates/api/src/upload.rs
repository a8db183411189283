//! Multipart upload staging
//!
//! The image field is streamed into a temporary file inside the upload
//! directory. The file is owned by [`StagedUpload`] and removed when it is
//! dropped, so every exit path of a request (including cancellation) cleans up.

use std::io;
use std::path::Path;

use axum::extract::Multipart;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::ApiError;

/// One uploaded file on disk
#[derive(Debug)]
pub struct StagedUpload {
    path: TempPath,
    field_name: String,
    file_name: Option<String>,
    size: u64,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// File name supplied by the client, if any
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Bytes written to disk
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read the whole file
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Delete the file now, reporting failures that a drop would swallow
    pub fn remove(self) -> io::Result<()> {
        self.path.close()
    }
}

/// Stream the first file field named `field_name` into `dir`.
///
/// Returns `Ok(None)` when no such file field exists. Fields with other names,
/// and plain (non-file) fields, are skipped.
pub async fn stage_upload(
    multipart: &mut Multipart,
    field_name: &str,
    dir: &Path,
) -> Result<Option<StagedUpload>, ApiError> {
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(field_name) || field.file_name().is_none() {
            debug!("Skipping multipart field {:?}", field.name());
            continue;
        }
        let file_name = field.file_name().map(str::to_string);

        let (file, path) = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(dir)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Staged {} bytes at {}", size, path.display());
        return Ok(Some(StagedUpload {
            path,
            field_name: field_name.to_string(),
            file_name,
            size,
        }));
    }
    Ok(None)
}
