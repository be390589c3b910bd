//! Release checks: obtain two snapshots and turn them into a [`Report`].

use std::cmp::Ordering;
use std::future::Future;

use crate::differ::diff_packages;
use crate::error::{ApirelError, Result};
use crate::modpath::{check_mod_path, split_path_version};
use crate::report::Report;
use crate::types::{Snapshot, TypeNode};
use crate::version::{self, Version};

/// Source of snapshots for revisions of one library.
///
/// Implementations own everything environment-specific (repository
/// location, checkout, toolchain settings) and receive it at construction.
/// Loading is asynchronous; the core never picks a runtime.
pub trait SnapshotProvider {
    /// Load the snapshot for `revision`, a tag or commit.
    fn snapshot(&self, revision: &str) -> impl Future<Output = Result<Snapshot>> + Send;
}

/// Versions to compare and how to name their tags.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// Version of the previous release. `None` means first release.
    pub base_version: Option<String>,
    /// Version proposed for the new release.
    pub release_version: Option<String>,
    /// Prefix of tags for modules in repository subdirectories, e.g. `sub/`.
    pub tag_prefix: String,
}

impl ReleaseRequest {
    pub fn new(base_version: Option<&str>, release_version: Option<&str>) -> Self {
        Self {
            base_version: base_version.map(str::to_string),
            release_version: release_version.map(str::to_string),
            tag_prefix: String::new(),
        }
    }

    pub fn with_tag_prefix(mut self, prefix: &str) -> Self {
        self.tag_prefix = prefix.to_string();
        self
    }

    /// Reject version pairs that cannot describe a release.
    pub fn validate(&self) -> Result<()> {
        if let Some(base) = &self.base_version {
            require_canonical(base)?;
        }
        if let Some(release) = &self.release_version {
            require_canonical(release)?;
        }

        match (&self.base_version, &self.release_version) {
            (Some(base), Some(release)) => match version::compare(base, release) {
                Ordering::Equal => Err(invalid_request(format!(
                    "base version ({base}) and release version ({release}) must be different"
                ))),
                Ordering::Greater => Err(invalid_request(format!(
                    "base version ({base}) must be lower than release version ({release})"
                ))),
                Ordering::Less => Ok(()),
            },
            (None, Some(release)) if !version::likely_first_version(release) => {
                Err(invalid_request(format!(
                    "no base version was found and {release} does not look like a first release"
                )))
            }
            _ => Ok(()),
        }
    }

    /// Tag name of a version under the configured prefix.
    pub fn tag(&self, version: &str) -> String {
        format!("{}{}", self.tag_prefix, version)
    }
}

fn require_canonical(text: &str) -> Result<()> {
    let parsed = Version::parse(text)?;
    if !parsed.is_canonical() || parsed.canonical() != text {
        return Err(ApirelError::NonCanonicalVersion {
            version: text.to_string(),
        });
    }
    Ok(())
}

fn invalid_request(message: String) -> ApirelError {
    ApirelError::InvalidRequest { message }
}

/// Compare two loaded snapshots and build the release report.
///
/// Without `old` only the new snapshot's errors are reported. A base
/// snapshot published under a different major version path is compared as
/// if it lived at the new module path.
pub fn build_report(request: &ReleaseRequest, old: Option<&Snapshot>, new: &Snapshot) -> Result<Report> {
    new.validate()?;
    check_mod_path(&new.module_path)?;

    let old = match old {
        Some(old) => {
            old.validate()?;
            Some(rebase(old, &new.module_path)?)
        }
        None => None,
    };

    let mut report = Report::new(
        &new.module_path,
        request.base_version.as_deref().unwrap_or_default(),
        request.release_version.as_deref().unwrap_or_default(),
    )
    .with_tag_prefix(&request.tag_prefix);

    for diagnostic in &new.diagnostics {
        report.add_diagnostic(diagnostic);
    }
    for package in diff_packages(old.as_ref(), new) {
        report.add_package(package);
    }

    tracing::info!(
        module = %report.module_path,
        packages = report.packages.len(),
        compatible = report.has_compatible_changes(),
        incompatible = report.has_incompatible_changes(),
        errors = report.has_errors(),
        "release report built"
    );
    Ok(report)
}

/// Move a base snapshot onto `module_path` when only the major version
/// suffix differs.
fn rebase(old: &Snapshot, module_path: &str) -> Result<Snapshot> {
    if old.module_path == module_path {
        return Ok(old.clone());
    }
    let prefix_of = |path: &str| split_path_version(path).map(|(prefix, _)| prefix.to_string());
    if prefix_of(&old.module_path) != prefix_of(module_path) {
        return Err(invalid_request(format!(
            "module path changed from {} to {}",
            old.module_path, module_path
        )));
    }
    tracing::debug!(from = %old.module_path, to = %module_path, "rebasing base snapshot");

    let from = old.module_path.as_str();
    let move_path = |path: &mut String| {
        if let Some(rest) = path.strip_prefix(from) {
            if rest.is_empty() || rest.starts_with('/') || rest.starts_with('.') {
                *path = format!("{}{}", module_path, rest);
            }
        }
    };

    let mut rebased = old.clone();
    rebased.module_path = module_path.to_string();
    for package in &mut rebased.packages {
        move_path(&mut package.path);
    }
    for node in &mut rebased.types {
        match node {
            TypeNode::Named { name, .. } | TypeNode::Alias { name, .. } => move_path(name),
            _ => {}
        }
    }
    rebased.sort_packages();
    Ok(rebased)
}

/// Run a release check of `new` through `provider`.
///
/// The base snapshot is read from the base version's tag; without a base
/// version nothing is loaded and `new` is checked as a first release.
pub async fn check_release<P: SnapshotProvider>(
    provider: &P,
    request: &ReleaseRequest,
    new: &Snapshot,
) -> Result<Report> {
    request.validate()?;
    let old = match &request.base_version {
        Some(base) => Some(provider.snapshot(&request.tag(base)).await?),
        None => None,
    };
    build_report(request, old.as_ref(), new)
}
