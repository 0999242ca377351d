use axum::body::Bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

use crate::config::UploadConfig;

const MB: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File too large: {size} bytes exceeds the {limit} byte limit for {kind} uploads")]
    TooLarge {
        kind: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("Unsupported file type for {kind} upload: {detail}")]
    UnsupportedType { kind: &'static str, detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// What a given upload field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPolicy {
    /// jpeg/jpg/png/gif/webp up to 10 MB
    Image,
    /// pdf/doc/docx up to 5 MB
    Document,
}

impl UploadPolicy {
    pub fn kind(self) -> &'static str {
        match self {
            UploadPolicy::Image => "image",
            UploadPolicy::Document => "document",
        }
    }

    pub fn max_bytes(self) -> usize {
        match self {
            UploadPolicy::Image => 10 * MB,
            UploadPolicy::Document => 5 * MB,
        }
    }

    fn extensions(self) -> &'static [&'static str] {
        match self {
            UploadPolicy::Image => &["jpeg", "jpg", "png", "gif", "webp"],
            UploadPolicy::Document => &["pdf", "doc", "docx"],
        }
    }

    fn mime_types(self) -> &'static [&'static str] {
        match self {
            UploadPolicy::Image => &["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"],
            UploadPolicy::Document => &[
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ],
        }
    }

    /// Check size, extension and declared content type. Returns the
    /// normalized extension to store the file under.
    pub fn check(self, file: &UploadedFile) -> Result<&'static str, UploadError> {
        if file.bytes.len() > self.max_bytes() {
            return Err(UploadError::TooLarge {
                kind: self.kind(),
                size: file.bytes.len(),
                limit: self.max_bytes(),
            });
        }

        let extension = file
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| UploadError::UnsupportedType {
                kind: self.kind(),
                detail: "file name has no extension".to_string(),
            })?;

        let allowed = self
            .extensions()
            .iter()
            .copied()
            .find(|allowed| *allowed == extension)
            .ok_or_else(|| UploadError::UnsupportedType {
                kind: self.kind(),
                detail: format!(".{} (allowed: {})", extension, self.extensions().join(", ")),
            })?;

        if let Some(content_type) = file.content_type.as_deref() {
            let essence = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            if !self.mime_types().iter().any(|mime| *mime == essence) {
                return Err(UploadError::UnsupportedType {
                    kind: self.kind(),
                    detail: content_type.to_string(),
                });
            }
        }

        Ok(allowed)
    }
}

/// A file part pulled out of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// A file written to disk, with the URL clients fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: PathBuf,
    pub url: String,
}

/// Local-disk upload storage served back under a public URL prefix.
#[derive(Debug, Clone)]
pub struct LocalUploads {
    dir: PathBuf,
    public_base: String,
}

impl LocalUploads {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            public_base: config.public_base.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_base(&self) -> &str {
        &self.public_base
    }

    pub async fn save(
        &self,
        file: &UploadedFile,
        policy: UploadPolicy,
    ) -> Result<StoredFile, UploadError> {
        let extension = policy.check(file)?;
        let name = format!("{}.{}", Uuid::new_v4(), extension);

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &file.bytes).await?;

        tracing::info!(
            "Stored {} upload {:?} as {} ({} bytes)",
            policy.kind(),
            file.file_name,
            name,
            file.bytes.len()
        );

        Ok(StoredFile {
            url: format!("{}/{}", self.public_base, name),
            path,
        })
    }

    /// Map a URL produced by [`save`](Self::save) back to its file. URLs
    /// pointing anywhere else yield `None`.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let name = url.strip_prefix(&self.public_base)?.strip_prefix('/')?;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return None;
        }
        Some(self.dir.join(name))
    }

    /// Best-effort delete; failures are logged.
    pub async fn remove(&self, path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!("Failed to remove upload {}: {}", path.display(), e);
        }
    }
}

/// Files written during a request that must be deleted again if the
/// request's store write fails. Not atomic: a crash in between leaves an
/// orphan on disk.
#[derive(Debug, Default)]
pub struct Compensations {
    files: Vec<PathBuf>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: PathBuf) {
        self.files.push(path);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub async fn rollback(self, uploads: &LocalUploads) {
        for path in self.files {
            tracing::warn!("Rolling back upload {}", path.display());
            uploads.remove(&path).await;
        }
    }

    /// The write succeeded; keep everything.
    pub fn commit(self) {}
}
