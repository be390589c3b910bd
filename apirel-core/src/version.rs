//! Semantic version strings with a leading `v`.
//!
//! Versions are compared component by component as decimal strings, so
//! numbers of any length are handled without overflow. Shorthand forms
//! (`v1`, `v1.2`) parse but are not canonical.

use std::cmp::Ordering;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ApirelError, Result};

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^v(0|[1-9][0-9]*)(?:\.(0|[1-9][0-9]*)(?:\.(0|[1-9][0-9]*)(?:-([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+([0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?)?)?$",
    )
    .unwrap()
});

/// A parsed semantic version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: String,
    pub minor: String,
    pub patch: String,
    /// Pre-release identifiers without the leading `-`.
    pub prerelease: String,
    /// Build metadata without the leading `+`; ignored for ordering.
    pub build: String,
    shorthand: bool,
}

impl Version {
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || ApirelError::InvalidVersion {
            version: text.to_string(),
        };
        let caps = SEMVER.captures(text).ok_or_else(invalid)?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

        let prerelease = group(4).unwrap_or_default();
        let numeric_leading_zero = prerelease.split('.').any(|ident| {
            ident.len() > 1 && ident.starts_with('0') && ident.bytes().all(|b| b.is_ascii_digit())
        });
        if !prerelease.is_empty() && numeric_leading_zero {
            return Err(invalid());
        }

        let minor = group(2);
        let patch = group(3);
        let shorthand = minor.is_none() || patch.is_none();
        Ok(Self {
            major: group(1).unwrap_or_default(),
            minor: minor.unwrap_or_else(|| "0".to_string()),
            patch: patch.unwrap_or_else(|| "0".to_string()),
            prerelease,
            build: group(5).unwrap_or_default(),
            shorthand,
        })
    }

    /// Whether `text` was already in the form [`Version::canonical`] returns.
    pub fn is_canonical(&self) -> bool {
        !self.shorthand && self.build.is_empty()
    }

    /// `vMAJOR.MINOR.PATCH[-PRERELEASE]`, without build metadata.
    pub fn canonical(&self) -> String {
        let mut out = format!("v{}.{}.{}", self.major, self.minor, self.patch);
        if !self.prerelease.is_empty() {
            out.push('-');
            out.push_str(&self.prerelease);
        }
        out
    }

    /// Major version prefix, e.g. `v2`.
    pub fn major_prefix(&self) -> String {
        format!("v{}", self.major)
    }

    /// Major and minor prefix, e.g. `v2.3`.
    pub fn major_minor(&self) -> String {
        format!("v{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_decimal(&self.major, &other.major)
            .then_with(|| compare_decimal(&self.minor, &other.minor))
            .then_with(|| compare_decimal(&self.patch, &other.patch))
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }
}

/// Whether `text` is a valid semantic version.
pub fn is_valid(text: &str) -> bool {
    Version::parse(text).is_ok()
}

/// Canonical form of `text`, or `None` when it is not a valid version.
pub fn canonical(text: &str) -> Option<String> {
    Version::parse(text).ok().map(|v| v.canonical())
}

/// Major prefix (`v2`) of a version, or an empty string if it is invalid.
pub fn major(text: &str) -> String {
    Version::parse(text)
        .map(|v| v.major_prefix())
        .unwrap_or_default()
}

/// Major and minor prefix (`v2.3`), or an empty string if invalid.
pub fn major_minor(text: &str) -> String {
    Version::parse(text)
        .map(|v| v.major_minor())
        .unwrap_or_default()
}

/// Order two version strings. Invalid versions sort before all valid ones
/// and are equal to each other.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (Version::parse(a), Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => Ordering::Equal,
    }
}

/// Split a full version into its major, minor and patch numbers, dropping
/// pre-release and build suffixes.
pub fn split_version_numbers(text: &str) -> Result<(String, String, String)> {
    let Some(rest) = text.strip_prefix('v') else {
        return Err(ApirelError::InvalidVersion {
            version: text.to_string(),
        });
    };
    let base = rest.split(|c: char| c == '-' || c == '+').next().unwrap_or(rest);
    let parts: Vec<&str> = base.split('.').collect();
    match parts.as_slice() {
        [major, minor, patch] => Ok((major.to_string(), minor.to_string(), patch.to_string())),
        _ => Err(ApirelError::InvalidVersion {
            version: text.to_string(),
        }),
    }
}

/// Add one to a decimal string, carrying as far as needed.
pub fn inc_decimal(decimal: &str) -> String {
    let mut digits: Vec<u8> = decimal.bytes().collect();
    let mut i = digits.len();
    while i > 0 && digits[i - 1] == b'9' {
        digits[i - 1] = b'0';
        i -= 1;
    }
    if i > 0 {
        digits[i - 1] += 1;
    } else {
        digits.insert(0, b'1');
    }
    String::from_utf8(digits).unwrap_or_default()
}

/// Whether `text` looks like the first release of a major version:
/// `vN.0.0`, `v0.1.0` or `v0.0.1`.
pub fn likely_first_version(text: &str) -> bool {
    match split_version_numbers(text) {
        Ok((_, minor, patch)) => {
            (minor == "0" && patch == "0") || text == "v0.1.0" || text == "v0.0.1"
        }
        Err(_) => false,
    }
}

fn compare_decimal(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn is_numeric(ident: &str) -> bool {
    !ident.is_empty() && ident.bytes().all(|b| b.is_ascii_digit())
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (is_numeric(x), is_numeric(y)) {
                    (true, true) => compare_decimal(x, y),
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
