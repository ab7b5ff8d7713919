use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::Backend;
use crate::prefix::Prefix;
use crate::retention::{RetentionAnchor, RetentionPlan, plan_retention};
use crate::tree::ObjectTree;

const GIB: u64 = 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Files of at least this many bytes are sent as multipart uploads.
    pub multipart_threshold: u64,
    /// Upper bound on key operations in flight at once.
    pub concurrency: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            multipart_threshold: 5 * GIB,
            concurrency: 4,
        }
    }
}

/// Per-key outcome of a bulk operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<KeyFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub error: String,
}

impl BatchReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    fn from_outcomes(outcomes: Vec<(String, Result<()>)>) -> Self {
        let mut report = Self::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(()) => report.succeeded.push(key),
                Err(err) => report.failed.push(KeyFailure {
                    key,
                    error: format!("{err:#}"),
                }),
            }
        }
        report.succeeded.sort();
        report.failed.sort_by(|a, b| a.key.cmp(&b.key));
        report
    }
}

/// Bulk upload and delete operations on top of a [`Backend`].
///
/// Each key is a separate backend call; one failed key never stops the
/// others, and the returned [`BatchReport`] names every key's outcome.
/// Listing or local traversal errors abort before anything is changed.
pub struct Transfer {
    backend: Arc<dyn Backend>,
    tree: ObjectTree,
    config: TransferConfig,
}

impl Transfer {
    pub fn new(backend: Arc<dyn Backend>, config: TransferConfig) -> Self {
        let tree = ObjectTree::new(backend.clone());
        Self {
            backend,
            tree,
            config,
        }
    }

    pub fn tree(&self) -> &ObjectTree {
        &self.tree
    }

    /// Delete every key below `dir`, nested directories included.
    pub async fn delete_all_under_directory(&self, dir: &Prefix) -> Result<BatchReport> {
        let names = self.tree.list_all_descendants(dir).await?;
        Ok(self.delete_names(dir, names).await)
    }

    /// Delete the objects directly inside `dir`, leaving subdirectories alone.
    pub async fn delete_immediate_children_only(&self, dir: &Prefix) -> Result<BatchReport> {
        let names = self.tree.list_immediate_children(dir).await?;
        Ok(self.delete_names(dir, names).await)
    }

    /// Evaluate the retention policy over the files directly inside `dir`
    /// without deleting anything.
    pub async fn plan_prune(&self, dir: &Prefix, anchor: &RetentionAnchor) -> Result<RetentionPlan> {
        let names = self.tree.list_immediate_children(dir).await?;
        let plan = plan_retention(&names, anchor);
        info!(
            dir = %dir,
            boundary = %plan.boundary,
            keep = plan.keep.len(),
            delete = plan.delete.len(),
            "Evaluated retention policy"
        );
        Ok(plan)
    }

    /// Delete what the retention policy selects. The decision is taken from
    /// a single listing before the first delete is issued.
    pub async fn prune_by_retention_policy(
        &self,
        dir: &Prefix,
        anchor: &RetentionAnchor,
    ) -> Result<BatchReport> {
        let plan = self.plan_prune(dir, anchor).await?;
        Ok(self.execute_plan(dir, plan).await)
    }

    /// Delete the files a previously computed plan selected, e.g. after the
    /// user confirmed it.
    pub async fn execute_plan(&self, dir: &Prefix, plan: RetentionPlan) -> BatchReport {
        self.delete_names(dir, plan.delete).await
    }

    /// Upload every file below `local_dir`, mirroring its subdirectories
    /// under `dir`.
    pub async fn upload_tree(&self, dir: &Prefix, local_dir: &Path) -> Result<BatchReport> {
        let mut jobs = Vec::new();
        let mut rejected = Vec::new();
        let mut pending = vec![(local_dir.to_path_buf(), dir.clone())];
        while let Some((path, prefix)) = pending.pop() {
            for entry in read_local_dir(&path).await? {
                match (entry.is_dir, entry.valid_name) {
                    (true, true) => pending.push((entry.path, prefix.child(&entry.name)?)),
                    (true, false) => rejected.push(prefix.key_for(&format!("{}/", entry.name))),
                    (false, true) => jobs.push((entry.path, prefix.key_for(&entry.name))),
                    (false, false) => rejected.push(prefix.key_for(&entry.name)),
                }
            }
        }
        Ok(self.upload_jobs(jobs, rejected).await)
    }

    /// Upload only the files directly inside `local_dir`.
    pub async fn upload_flat(&self, dir: &Prefix, local_dir: &Path) -> Result<BatchReport> {
        let mut jobs = Vec::new();
        let mut rejected = Vec::new();
        for entry in read_local_dir(local_dir).await? {
            if entry.is_dir {
                continue;
            }
            let key = dir.key_for(&entry.name);
            if entry.valid_name {
                jobs.push((entry.path, key));
            } else {
                rejected.push(key);
            }
        }
        Ok(self.upload_jobs(jobs, rejected).await)
    }

    async fn delete_names(&self, dir: &Prefix, names: Vec<String>) -> BatchReport {
        let backend = &self.backend;
        let outcomes: Vec<(String, Result<()>)> = stream::iter(names)
            .map(|name| async move {
                let key = dir.key_for(&name);
                let outcome = backend.delete(&key).await;
                match &outcome {
                    Ok(()) => info!(key = %key, "Deleted"),
                    Err(err) => warn!(key = %key, error = %format!("{err:#}"), "Delete failed"),
                }
                (key, outcome)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;
        BatchReport::from_outcomes(outcomes)
    }

    /// Upload `jobs`; `rejected` are keys of local entries that could not be
    /// named and are reported as failed without a backend call.
    async fn upload_jobs(&self, jobs: Vec<(PathBuf, String)>, rejected: Vec<String>) -> BatchReport {
        let backend = &self.backend;
        let config = &self.config;
        let mut outcomes: Vec<(String, Result<()>)> = stream::iter(jobs)
            .map(|(path, key)| async move {
                let outcome = backend.upload_file(&key, &path, config).await;
                match &outcome {
                    Ok(()) => info!(key = %key, "Uploaded"),
                    Err(err) => warn!(key = %key, error = %format!("{err:#}"), "Upload failed"),
                }
                (key, outcome)
            })
            .buffer_unordered(config.concurrency.max(1))
            .collect()
            .await;
        for key in rejected {
            warn!(key = %key, "Local file name is not valid UTF-8");
            outcomes.push((key, Err(anyhow::anyhow!("non UTF-8 file name"))));
        }
        BatchReport::from_outcomes(outcomes)
    }
}

struct LocalEntry {
    /// Lossy when the file name is not UTF-8.
    name: String,
    valid_name: bool,
    path: PathBuf,
    is_dir: bool,
}

async fn read_local_dir(dir: &Path) -> Result<Vec<LocalEntry>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        let file_name = entry.file_name();
        let valid_name = file_name.to_str().is_some();
        let name = file_name.to_string_lossy().into_owned();
        let is_dir = tokio::fs::metadata(&path)
            .await
            .with_context(|| format!("failed to stat: {}", path.display()))?
            .is_dir();
        entries.push(LocalEntry {
            name,
            valid_name,
            path,
            is_dir,
        });
    }
    Ok(entries)
}
