//! Diff command - compare two snapshot files without git
//!
//! Produces the same report as `check`, reading both snapshots from disk.

use std::path::Path;

use anyhow::Context;
use apirel_core::{build_report, ReleaseRequest, Snapshot};

use super::ReportView;
use crate::output::{Output, OutputConfig};

async fn load(path: &Path) -> anyhow::Result<Snapshot> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("could not read snapshot {}", path.display()))?;
    let mut snapshot = Snapshot::from_json(&text)
        .with_context(|| format!("{} is not a valid snapshot", path.display()))?;
    snapshot.sort_packages();
    Ok(snapshot)
}

pub async fn run(
    old_path: &Path,
    new_path: &Path,
    base: Option<&str>,
    version: Option<&str>,
    tag_prefix: &str,
    config: OutputConfig,
) -> anyhow::Result<bool> {
    let request = ReleaseRequest::new(base, version).with_tag_prefix(tag_prefix);
    request.validate()?;

    let (old, new) = tokio::try_join!(load(old_path), load(new_path))?;

    let report = build_report(&request, Some(&old), &new)?;
    let view = ReportView::new(report);
    let success = view.success;
    Output::with_config(view, config).render()?;
    Ok(success)
}
