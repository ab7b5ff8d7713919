use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Backend;

/// Stores each key as a file below `root`, with `/` mapped to directories.
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create directory: {}", root.display()))?;
        Ok(Self { root })
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, key_prefix)) = pending.pop() {
            let mut read_dir = tokio::fs::read_dir(&dir)
                .await
                .with_context(|| format!("failed to list: {}", dir.display()))?;
            while let Some(entry) = read_dir.next_entry().await? {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = format!("{key_prefix}{name}");
                let path = entry.path();
                // Follow symlinks, as `delete` does through `is_file`.
                let is_dir = tokio::fs::metadata(&path)
                    .await
                    .with_context(|| format!("failed to stat: {}", path.display()))?
                    .is_dir();
                if is_dir {
                    pending.push((path, format!("{key}/")));
                } else if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let full = self.full_path(key);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, data)
            .await
            .with_context(|| format!("failed to write: {}", full.display()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full = self.full_path(key);
        if full.is_file() {
            tokio::fs::remove_file(&full)
                .await
                .with_context(|| format!("failed to delete: {}", full.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();

        backend.put("db/2024-01-01-a.tar.gz", b"one").await.unwrap();
        backend.put("db/nested/b.txt", b"two").await.unwrap();
        backend.put("other.txt", b"three").await.unwrap();

        let all = backend.list_keys("").await.unwrap();
        assert_eq!(
            all,
            vec!["db/2024-01-01-a.tar.gz", "db/nested/b.txt", "other.txt"]
        );
        let db = backend.list_keys("db/").await.unwrap();
        assert_eq!(db, vec!["db/2024-01-01-a.tar.gz", "db/nested/b.txt"]);

        backend.delete("db/nested/b.txt").await.unwrap();
        assert_eq!(backend.list_keys("db/").await.unwrap().len(), 1);
        assert!(backend.delete("missing").await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_directories_are_listed_and_deletable() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("2024-01-01-a.tar.gz"), b"a").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(dir.path()).unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked")).unwrap();

        let keys = backend.list_keys("").await.unwrap();
        assert_eq!(keys, vec!["linked/2024-01-01-a.tar.gz"]);

        backend.delete("linked/2024-01-01-a.tar.gz").await.unwrap();
        assert!(backend.list_keys("").await.unwrap().is_empty());
        assert!(!outside.path().join("2024-01-01-a.tar.gz").exists());
    }
}
