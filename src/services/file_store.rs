//! Image file storage
//!
//! Uploaded images live on disk under `<root>/<namespace>/`, where the
//! namespace is [`PRODUCT_IMAGES`] or [`MOVIE_IMAGES`]. Only the stored file
//! name is kept in the database; the public URL is derived from it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub const PRODUCT_IMAGES: &str = "products";
pub const MOVIE_IMAGES: &str = "movies";

/// Suffixed names tried once the plain name is taken
const MAX_NAME_ATTEMPTS: u32 = 8;

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Storage for uploaded image files
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write the upload and return the stored file name
    async fn save(&self, namespace: &str, upload: &Upload) -> Result<String>;

    /// Remove a stored file; a file that is already gone is not an error
    async fn remove(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Files on the local disk
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn boxed(root: impl Into<PathBuf>) -> Arc<dyn FileStore> {
        Arc::new(Self::new(root))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(&self, namespace: &str, upload: &Upload) -> Result<String> {
        let dir = self.root.join(namespace);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create upload dir {}", dir.display()))?;

        let ext = file_extension(upload.file_name.as_deref(), &upload.content_type);
        let stem = format!("image_{}", Utc::now().timestamp());
        let mut name = format!("{}.{}", stem, ext);

        // create_new claims the name; a taken name gets a random suffix
        let mut attempts = 0;
        let mut file = loop {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&name))
                .await
            {
                Ok(file) => break file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists && attempts < MAX_NAME_ATTEMPTS => {
                    attempts += 1;
                    let suffix = Uuid::new_v4().simple().to_string();
                    name = format!("{}_{}.{}", stem, &suffix[..8], ext);
                }
                Err(e) => {
                    return Err(e).with_context(|| format!("Failed to create file {}", name));
                }
            }
        };

        let written = async {
            file.write_all(&upload.data).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = fs::remove_file(dir.join(&name)).await {
                tracing::warn!("Failed to remove partial file {}: {}", name, cleanup);
            }
            return Err(e).with_context(|| format!("Failed to save file {}", name));
        }

        Ok(name)
    }

    async fn remove(&self, namespace: &str, name: &str) -> Result<()> {
        let path = self.root.join(namespace).join(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

/// URL under which a stored file is served
pub fn public_url(namespace: &str, name: &str) -> String {
    format!("/uploads/{}/{}", namespace, name)
}

/// Extension from the client file name, else from the MIME type
fn file_extension(file_name: Option<&str>, content_type: &str) -> String {
    let from_name = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() < 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext.to_lowercase();
    }

    match content_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
    .to_string()
}
