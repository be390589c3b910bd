//! Check command - validate a release of the library at HEAD
//!
//! Reads the snapshot document committed at HEAD and at the base version's
//! tag, compares them and prints the release report.

use std::path::Path;

use anyhow::{bail, Context};
use apirel_core::{check_release, ReleaseRequest, SnapshotProvider};

use super::ReportView;
use crate::git::{latest_version, GitRepo, GitSnapshots};
use crate::output::{Output, OutputConfig};

/// Options of one `apirel check` run.
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// Explicit base version; `"none"` forces first-release mode.
    pub base: Option<String>,
    /// Proposed release version.
    pub version: Option<String>,
    /// Snapshot document path relative to the repository root.
    pub snapshot_path: String,
    pub tag_prefix: String,
}

const HEAD: &str = "HEAD";

pub async fn run(dir: &Path, options: &CheckOptions, config: OutputConfig) -> anyhow::Result<bool> {
    let repo = GitRepo::discover(dir)
        .await
        .context("apirel check must be run inside a git repository")?;

    if repo.has_pending_changes().await? {
        bail!("repository has uncommitted changes; commit or stash them before checking a release");
    }

    let provider = GitSnapshots::new(&repo, &options.snapshot_path);
    let (new, tags) = tokio::try_join!(
        async { anyhow::Ok(provider.snapshot(HEAD).await?) },
        async { anyhow::Ok(repo.merged_tags().await?) },
    )?;

    let base = match options.base.as_deref() {
        Some("none") => None,
        Some(base) => Some(base.to_string()),
        None => {
            let detected = latest_version(&tags, &options.tag_prefix, &new.module_path);
            match &detected {
                Some(v) => tracing::info!(base = %v, "detected base version"),
                None => tracing::info!("no base version tag found"),
            }
            detected
        }
    };

    let request = ReleaseRequest::new(base.as_deref(), options.version.as_deref())
        .with_tag_prefix(&options.tag_prefix);

    let report = check_release(&provider, &request, &new).await?;
    let view = ReportView::new(report);
    let success = view.success;
    Output::with_config(view, config).render()?;
    Ok(success)
}
