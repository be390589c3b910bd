//! Release report: per-package changes and errors, aggregate flags and the
//! version verdict rendered from them.

use std::fmt;

use serde::Serialize;

use crate::differ::Change;
use crate::policy::{self, PolicyInput, Rejection};
use crate::version;

/// Changes and load errors for one package path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    pub path: String,
    pub changes: Vec<Change>,
    /// Load errors in the old snapshot.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub old_errors: Vec<String>,
    /// Load errors in the new snapshot.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub new_errors: Vec<String>,
}

impl PackageReport {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Nothing to show for this package.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.old_errors.is_empty() && self.new_errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.old_errors.is_empty() || !self.new_errors.is_empty()
    }

    pub fn incompatible_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| !c.compatible)
    }

    pub fn compatible_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(|c| c.compatible)
    }
}

impl fmt::Display for PackageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", "-".repeat(self.path.len()))?;

        for (header, errors) in [
            ("errors in old version:", &self.old_errors),
            ("errors in new version:", &self.new_errors),
        ] {
            if errors.is_empty() {
                continue;
            }
            writeln!(f, "{}", header)?;
            for e in errors {
                writeln!(f, "\t{}", e)?;
            }
            writeln!(f)?;
        }

        if !self.changes.is_empty() {
            write_changes(f, "Incompatible changes:", self.incompatible_changes())?;
            write_changes(f, "Compatible changes:", self.compatible_changes())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

fn write_changes<'a>(
    f: &mut fmt::Formatter<'_>,
    header: &str,
    changes: impl Iterator<Item = &'a Change>,
) -> fmt::Result {
    let mut changes = changes.peekable();
    if changes.peek().is_none() {
        return Ok(());
    }
    writeln!(f, "{}", header)?;
    for c in changes {
        writeln!(f, "- {}", c.line())?;
    }
    Ok(())
}

/// Outcome of comparing a library at two revisions.
///
/// The aggregate flags are updated as packages are added and never
/// recomputed from the package list.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    pub module_path: String,
    /// Empty when there is no base version.
    pub base_version: String,
    /// Empty when no version was proposed.
    pub release_version: String,
    /// Prefix of release tags for modules in repository subdirectories.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag_prefix: String,
    pub packages: Vec<PackageReport>,
    pub diagnostics: Vec<String>,
    has_compatible_changes: bool,
    has_incompatible_changes: bool,
    has_errors: bool,
}

impl Report {
    pub fn new(module_path: &str, base_version: &str, release_version: &str) -> Self {
        Self {
            module_path: module_path.to_string(),
            base_version: base_version.to_string(),
            release_version: release_version.to_string(),
            ..Default::default()
        }
    }

    pub fn with_tag_prefix(mut self, prefix: &str) -> Self {
        self.tag_prefix = prefix.to_string();
        self
    }

    /// Append a package and fold its changes and errors into the flags.
    pub fn add_package(&mut self, package: PackageReport) {
        for c in &package.changes {
            if c.compatible {
                self.has_compatible_changes = true;
            } else {
                self.has_incompatible_changes = true;
            }
        }
        if package.has_errors() {
            self.has_errors = true;
        }
        self.packages.push(package);
    }

    pub fn add_diagnostic(&mut self, diagnostic: &str) {
        self.diagnostics.push(diagnostic.to_string());
    }

    pub fn has_compatible_changes(&self) -> bool {
        self.has_compatible_changes
    }

    pub fn has_incompatible_changes(&self) -> bool {
        self.has_incompatible_changes
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    fn release(&self) -> Option<&str> {
        Some(self.release_version.as_str()).filter(|v| !v.is_empty())
    }

    pub fn policy_input(&self) -> PolicyInput<'_> {
        PolicyInput {
            module_path: &self.module_path,
            base_version: &self.base_version,
            has_compatible: self.has_compatible_changes,
            has_incompatible: self.has_incompatible_changes,
            has_errors: self.has_errors,
        }
    }

    /// Validation of the proposed version, if there is one.
    pub fn validate_version(&self) -> Option<Result<(), Rejection>> {
        self.release()
            .map(|v| policy::validate_version(&self.policy_input(), v))
    }

    /// Next version consistent with the changes; needs a base version.
    pub fn suggest_version(&self) -> Option<String> {
        policy::suggest_version(
            &self.base_version,
            self.has_compatible_changes,
            self.has_incompatible_changes,
        )
        .ok()
    }

    pub fn is_successful(&self) -> bool {
        policy::is_successful(&self.policy_input(), &self.diagnostics, self.release())
    }

    fn with_tag(&self, version: &str) -> String {
        if self.tag_prefix.is_empty() {
            version.to_string()
        } else {
            format!("{} (with tag {}{})", version, self.tag_prefix, version)
        }
    }

    /// Closing verdict: diagnostics, the proposed version's validity, or a
    /// suggested version.
    pub fn summary(&self) -> String {
        if !self.diagnostics.is_empty() {
            return self.diagnostics.join("\n");
        }
        if let Some(result) = self.validate_version() {
            return match result {
                Ok(()) => format!(
                    "{} is a valid semantic version for this release.",
                    self.with_tag(&self.release_version)
                ),
                Err(rejection) => rejection.to_string(),
            };
        }
        if self.has_errors {
            return "Errors were detected, so no version will be suggested.".to_string();
        }
        let Some(suggested) = self.suggest_version() else {
            return "No base version was given, so no version will be suggested.".to_string();
        };
        if self.has_incompatible_changes && version::major(&self.base_version) != "v0" {
            return format!(
                "Incompatible changes detected, so no version will be suggested.\n\
                 Use --version={} to verify a new major version.\n\
                 Avoid creating new major versions if possible though.",
                suggested
            );
        }
        format!("Suggested version: {}", self.with_tag(&suggested))
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.packages {
            write!(f, "{}", p)?;
        }
        writeln!(f, "{}", self.summary())
    }
}
