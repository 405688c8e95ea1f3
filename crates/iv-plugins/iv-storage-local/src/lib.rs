//! # iv-storage-local
//!
//! Local filesystem implementation of `MediaStore` for attached idea
//! images. Content-addressable: uploads are stored under their SHA-256
//! hash with two-level directory sharding, which deduplicates identical
//! files for free. Uploads must decode as images before anything touches
//! disk, so the store never serves arbitrary bytes.

use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use image::io::Reader as ImageReader;
use iv_core::error::{AppError, Result};
use iv_core::traits::MediaStore;
use sha2::{Digest, Sha256};
use tokio::fs;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Sharded relative path: "ab/cd/abcdef...hash.ext"
    fn sharded_rel(hash: &str, ext: &str) -> String {
        format!("{}/{}/{}.{}", &hash[0..2], &hash[2..4], hash, ext)
    }

    fn rel_to_path(&self, rel: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.extend(rel.split('/'));
        path
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Validates, hashes, and persists an upload; returns its public URL.
    async fn save_upload(&self, data: Vec<u8>, filename: &str) -> Result<String> {
        let reader = ImageReader::new(Cursor::new(&data))
            .with_guessed_format()
            .map_err(|e| AppError::Storage(format!("unreadable upload {filename}: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| AppError::Storage(format!("{filename} is not a known image format")))?;
        reader
            .decode()
            .map_err(|e| AppError::Storage(format!("{filename} does not decode: {e}")))?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = format!("{:x}", hasher.finalize());

        let rel = Self::sharded_rel(&hash, ext);
        let target = self.rel_to_path(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }

        // Identical content resolves to the same path; skip the rewrite.
        if !target.exists() {
            fs::write(&target, &data)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
            log::debug!("stored upload {filename} as {rel}");
        }

        Ok(format!("{}/{}", self.url_prefix, rel))
    }

    /// Removes an object previously returned by `save_upload`. URLs not
    /// owned by this store, and already-removed objects, are a no-op.
    async fn remove(&self, url: &str) -> Result<()> {
        let Some(rel) = url.strip_prefix(&format!("{}/", self.url_prefix)) else {
            return Ok(());
        };
        if !is_plain_relative(Path::new(rel)) {
            return Err(AppError::Storage(format!("refusing suspicious path {rel}")));
        }
        match fs::remove_file(self.rel_to_path(rel)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e.to_string())),
        }
    }
}

/// Only normal path segments allowed; no "..", no roots, no prefixes.
fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbImage};

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::new(2, 2);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn store(dir: &Path) -> LocalMediaStore {
        LocalMediaStore::new(dir.to_path_buf(), "/static/uploads".into())
    }

    #[tokio::test]
    async fn save_returns_public_url_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let url = store.save_upload(png_bytes(), "photo.png").await.unwrap();
        assert!(url.starts_with("/static/uploads/"));
        assert!(url.ends_with(".png"));

        let rel = url.strip_prefix("/static/uploads/").unwrap();
        assert!(store.rel_to_path(rel).exists());

        // identical content dedupes to the same URL
        let again = store.save_upload(png_bytes(), "other-name.png").await.unwrap();
        assert_eq!(url, again);
    }

    #[tokio::test]
    async fn non_image_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let err = store
            .save_upload(b"plain text, not pixels".to_vec(), "notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent_and_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let url = store.save_upload(png_bytes(), "photo.png").await.unwrap();
        let rel = url.strip_prefix("/static/uploads/").unwrap().to_string();

        store.remove(&url).await.unwrap();
        assert!(!store.rel_to_path(&rel).exists());
        // gone already: still fine
        store.remove(&url).await.unwrap();
        // someone else's URL: untouched and fine
        store.remove("https://elsewhere.example/img.png").await.unwrap();

        let err = store.remove("/static/uploads/../escape.png").await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
    }
}
