//! Git access for release checks.
//!
//! Every command runs with an explicit working directory taken from
//! [`GitRepo`]; nothing here reads or changes process-wide state.

use std::path::{Path, PathBuf};

use apirel_core::modpath::split_path_version;
use apirel_core::version::{self, Version};
use apirel_core::{ApirelError, Snapshot, SnapshotProvider};
use thiserror::Error;
use tokio::process::Command;

/// Errors from invoking git.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("could not run git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("{path} at {revision} is not a valid snapshot: {source}")]
    BadSnapshot {
        revision: String,
        path: String,
        source: apirel_core::ApirelError,
    },
}

/// A checked-out git repository.
#[derive(Debug, Clone)]
pub struct GitRepo {
    pub root: PathBuf,
}

impl GitRepo {
    /// Find the repository containing `dir`.
    pub async fn discover(dir: &Path) -> Result<Self, GitError> {
        let out = run_git(dir, &["rev-parse", "--show-toplevel"]).await?;
        Ok(Self {
            root: PathBuf::from(out.trim()),
        })
    }

    async fn git(&self, args: &[&str]) -> Result<String, GitError> {
        run_git(&self.root, args).await
    }

    /// Whether the working tree has uncommitted changes.
    pub async fn has_pending_changes(&self) -> Result<bool, GitError> {
        let status = self.git(&["status", "--porcelain"]).await?;
        Ok(!status.trim().is_empty())
    }

    /// Tags reachable from HEAD.
    pub async fn merged_tags(&self) -> Result<Vec<String>, GitError> {
        let out = self.git(&["tag", "--list", "--merged", "HEAD"]).await?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Contents of `path` (relative to the repository root) at `revision`.
    pub async fn show(&self, revision: &str, path: &str) -> Result<String, GitError> {
        self.git(&["show", &format!("{}:{}", revision, path)]).await
    }

    /// Load the snapshot document stored at `path` in `revision`.
    pub async fn snapshot(&self, revision: &str, path: &str) -> Result<Snapshot, GitError> {
        let text = self.show(revision, path).await?;
        let mut snapshot = Snapshot::from_json(&text).map_err(|source| GitError::BadSnapshot {
            revision: revision.to_string(),
            path: path.to_string(),
            source,
        })?;
        snapshot.sort_packages();
        tracing::debug!(
            revision,
            packages = snapshot.packages.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }
}

/// Snapshot documents committed at one path of a repository.
#[derive(Debug, Clone, Copy)]
pub struct GitSnapshots<'a> {
    pub repo: &'a GitRepo,
    /// Path of the snapshot document relative to the repository root.
    pub path: &'a str,
}

impl<'a> GitSnapshots<'a> {
    pub fn new(repo: &'a GitRepo, path: &'a str) -> Self {
        Self { repo, path }
    }
}

impl SnapshotProvider for GitSnapshots<'_> {
    async fn snapshot(&self, revision: &str) -> apirel_core::Result<Snapshot> {
        self.repo
            .snapshot(revision, self.path)
            .await
            .map_err(|e| ApirelError::Snapshot {
                revision: revision.to_string(),
                message: e.to_string(),
            })
    }
}

async fn run_git(dir: &Path, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(GitError::Failed {
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Highest release version among `tags` that can serve as the base for
/// `module_path`.
///
/// Tags must carry `prefix`, be canonical and have no pre-release part.
/// Their major version must match the module path's suffix; without a
/// suffix `v1` and `v0` qualify.
pub fn latest_version(tags: &[String], prefix: &str, module_path: &str) -> Option<String> {
    let (_, suffix) = split_path_version(module_path)?;
    let wanted = suffix
        .get(1..)
        .unwrap_or_default()
        .trim_end_matches("-unstable");

    tags.iter()
        .filter_map(|tag| tag.strip_prefix(prefix))
        .filter(|v| match Version::parse(v) {
            Ok(parsed) => parsed.canonical() == *v && parsed.prerelease.is_empty(),
            Err(_) => false,
        })
        .filter(|v| {
            let major = version::major(v);
            if wanted.is_empty() {
                major == "v0" || major == "v1"
            } else {
                major == wanted
            }
        })
        .max_by(|a, b| version::compare(a, b))
        .map(str::to_string)
}
