use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::backend::Backend;
use crate::prefix::Prefix;

/// Directory-style views over a flat key listing.
#[derive(Clone)]
pub struct ObjectTree {
    backend: Arc<dyn Backend>,
}

impl ObjectTree {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Every key in the bucket, unfiltered.
    pub async fn list_all_keys(&self) -> Result<Vec<String>> {
        self.backend.list_keys("").await
    }

    /// Names of the objects directly inside `dir`. Deeper keys are skipped.
    pub async fn list_immediate_children(&self, dir: &Prefix) -> Result<Vec<String>> {
        let keys = self.backend.list_keys(&dir.marker()).await?;
        let children = immediate_children(&keys, dir);
        debug!(dir = %dir, count = children.len(), "Listed immediate children");
        Ok(children)
    }

    /// Keys below `dir` at any depth, relative to `dir`.
    pub async fn list_all_descendants(&self, dir: &Prefix) -> Result<Vec<String>> {
        let keys = self.backend.list_keys(&dir.marker()).await?;
        let descendants = descendants(&keys, dir);
        debug!(dir = %dir, count = descendants.len(), "Listed descendants");
        Ok(descendants)
    }
}

pub fn immediate_children<S: AsRef<str>>(keys: &[S], dir: &Prefix) -> Vec<String> {
    keys.iter()
        .filter_map(|k| dir.immediate_child(k.as_ref()))
        .map(str::to_string)
        .collect()
}

pub fn descendants<S: AsRef<str>>(keys: &[S], dir: &Prefix) -> Vec<String> {
    keys.iter()
        .filter_map(|k| dir.relative(k.as_ref()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    fn prefix(s: &str) -> Prefix {
        Prefix::parse(s).unwrap()
    }

    #[test]
    fn scopes_children_and_descendants() {
        let keys = ["x", "x/a.txt", "x/y/b.txt"];
        assert_eq!(immediate_children(&keys, &prefix("x")), vec!["a.txt"]);
        assert_eq!(descendants(&keys, &prefix("x")), vec!["a.txt", "y/b.txt"]);
    }

    #[test]
    fn children_never_contain_delimiter() {
        let keys = ["a/b/c", "a/b/c/d", "a/b/e/f/g", "a/bc/d", "a/b/"];
        let children = immediate_children(&keys, &prefix("a/b"));
        assert_eq!(children, vec!["c"]);
        assert!(children.iter().all(|c| !c.contains('/')));
        assert_eq!(
            descendants(&keys, &prefix("a/b")),
            vec!["c", "c/d", "e/f/g"]
        );
    }

    #[test]
    fn listing_order_is_preserved() {
        let keys = ["d/z", "d/a", "d/m"];
        assert_eq!(immediate_children(&keys, &prefix("d")), vec!["z", "a", "m"]);
    }

    #[tokio::test]
    async fn unknown_directory_is_empty() {
        let tree = ObjectTree::new(Arc::new(MemoryBackend::with_keys(["x/a.txt"])));
        assert!(tree.list_immediate_children(&prefix("nope")).await.unwrap().is_empty());
        assert!(tree.list_all_descendants(&prefix("nope")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lists_through_backend() {
        let backend = MemoryBackend::with_keys(["x", "x/a.txt", "x/y/b.txt", "xx/c.txt"]);
        let tree = ObjectTree::new(Arc::new(backend));
        assert_eq!(tree.list_all_keys().await.unwrap().len(), 4);
        assert_eq!(
            tree.list_immediate_children(&prefix("x")).await.unwrap(),
            vec!["a.txt"]
        );
        assert_eq!(
            tree.list_all_descendants(&prefix("x")).await.unwrap(),
            vec!["a.txt", "y/b.txt"]
        );
    }
}
