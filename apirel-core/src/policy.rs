//! Version policy: suggest the next version or judge a proposed one.

use thiserror::Error;

use crate::error::Result;
use crate::modpath::split_path_version;
use crate::version::{inc_decimal, major, major_minor, split_version_numbers};

/// What the policy needs to know about a comparison.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PolicyInput<'a> {
    pub module_path: &'a str,
    /// Empty when there is no base version.
    pub base_version: &'a str,
    pub has_compatible: bool,
    pub has_incompatible: bool,
    pub has_errors: bool,
}

/// Why a proposed version does not fit the observed changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("{version} is not a valid semantic version for this release.\nErrors were found in one or more packages.")]
    Errors { version: String },

    #[error("{module_path}: could not find version suffix in module path")]
    NoSuffix { module_path: String },

    #[error("{module_path}: unknown module path version suffix: {suffix:?}")]
    UnknownSuffix { module_path: String, suffix: String },

    #[error("{version} is not a valid semantic version for this release.\nThe major version {major} does not match the major version suffix\nin the module path: {module_path}")]
    SuffixMismatch {
        version: String,
        major: String,
        module_path: String,
    },

    #[error("{version} is not a valid semantic version for this release.\nThe module path does not end with the major version suffix /{major},\nwhich is required for major versions v2 or greater.")]
    MissingSuffix { version: String, major: String },

    #[error("{version} is not a valid semantic version for this release.\nThere are incompatible changes.")]
    Incompatible { version: String },

    #[error("{version} is not a valid semantic version for this release.\nThere are compatible changes, but the major and minor version numbers\nare the same as the base version {base}.")]
    MinorNotIncreased { version: String, base: String },
}

/// Suggest the next version after `base`.
///
/// Incompatible changes bump the major version unless it is 0, compatible
/// changes bump the minor version, and anything else bumps the patch.
pub fn suggest_version(base: &str, has_compatible: bool, has_incompatible: bool) -> Result<String> {
    let (mut major, mut minor, mut patch) = split_version_numbers(base)?;

    if has_incompatible && major != "0" {
        major = inc_decimal(&major);
        minor = "0".to_string();
        patch = "0".to_string();
    } else if has_compatible || has_incompatible {
        minor = inc_decimal(&minor);
        patch = "0".to_string();
    } else {
        patch = inc_decimal(&patch);
    }
    Ok(format!("v{}.{}.{}", major, minor, patch))
}

/// Check `release` against the module path and the observed changes.
pub fn validate_version(input: &PolicyInput<'_>, release: &str) -> std::result::Result<(), Rejection> {
    let version = release.to_string();
    if input.has_errors {
        return Err(Rejection::Errors { version });
    }

    let Some((_, suffix)) = split_path_version(input.module_path) else {
        return Err(Rejection::NoSuffix {
            module_path: input.module_path.to_string(),
        });
    };
    let release_major = major(release);
    if !suffix.is_empty() {
        if !suffix.starts_with('/') && !suffix.starts_with('.') {
            return Err(Rejection::UnknownSuffix {
                module_path: input.module_path.to_string(),
                suffix: suffix.to_string(),
            });
        }
        let path_major = suffix[1..].trim_end_matches("-unstable");
        if path_major != release_major {
            return Err(Rejection::SuffixMismatch {
                version,
                major: release_major,
                module_path: input.module_path.to_string(),
            });
        }
    } else if release_major != "v0" && release_major != "v1" {
        return Err(Rejection::MissingSuffix {
            version,
            major: release_major,
        });
    }

    // Anything goes before v1, and a new major version may break anything.
    let base_major = major(input.base_version);
    if base_major == "v0" || base_major != release_major {
        return Ok(());
    }
    if input.has_incompatible {
        return Err(Rejection::Incompatible { version });
    }
    if input.has_compatible && major_minor(input.base_version) == major_minor(release) {
        return Err(Rejection::MinorNotIncreased {
            version,
            base: input.base_version.to_string(),
        });
    }
    Ok(())
}

/// Whether a release check passes.
///
/// Errors and diagnostics always fail. With a proposed version the result is
/// its validation; otherwise incompatible changes fail unless the base is an
/// unstable `v0` release.
pub fn is_successful(input: &PolicyInput<'_>, diagnostics: &[String], release: Option<&str>) -> bool {
    if input.has_errors || !diagnostics.is_empty() {
        return false;
    }
    match release {
        Some(release) => validate_version(input, release).is_ok(),
        None => !input.has_incompatible || major(input.base_version) == "v0",
    }
}
