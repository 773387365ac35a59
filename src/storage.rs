use std::path::PathBuf;

use anyhow::Context;
use axum::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put(&self, name: &str, body: Bytes) -> anyhow::Result<()>;
    /// Returns `None` when no object with this name exists.
    async fn get(&self, name: &str) -> anyhow::Result<Option<Bytes>>;
    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

/// Blob store over a server-local directory. Object names are flat
/// filenames; callers are responsible for sanitizing them.
#[derive(Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub async fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .with_context(|| format!("create storage dir {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl StorageClient for DiskStorage {
    async fn put(&self, name: &str, body: Bytes) -> anyhow::Result<()> {
        let path = self.root.join(name);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    async fn get(&self, name: &str) -> anyhow::Result<Option<Bytes>> {
        let path = self.root.join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read {}", path.display())),
        }
    }

    async fn list(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e).context("read storage dir"),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Ok(name) = entry.file_name().into_string() {
                if name.starts_with(prefix) {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
