//! Module path checks and major version suffixes.

use crate::error::{ApirelError, Result};

/// Split a module path into its prefix and major version suffix.
///
/// `example.com/m/v2` gives `("example.com/m", "/v2")`, `example.com/m`
/// gives `("example.com/m", "")` and `gopkg.in/yaml.v2` gives
/// `("gopkg.in/yaml", ".v2")`. Returns `None` when the path ends in
/// something that looks like a suffix but is not a valid one (`/v1`,
/// `/v02`, `/v2.1`).
pub fn split_path_version(path: &str) -> Option<(&str, &str)> {
    if path.starts_with("gopkg.in/") {
        return split_gopkg_in(path);
    }

    let bytes = path.as_bytes();
    let mut i = bytes.len();
    let mut dot = false;
    while i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
        dot |= bytes[i - 1] == b'.';
        i -= 1;
    }
    if i <= 1 || i == bytes.len() || bytes[i - 1] != b'v' || bytes[i - 2] != b'/' {
        return Some((path, ""));
    }
    let (prefix, major) = path.split_at(i - 2);
    if dot || major.len() <= 2 || major.as_bytes()[2] == b'0' || major == "/v1" {
        return None;
    }
    Some((prefix, major))
}

fn split_gopkg_in(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    let mut i = path.strip_suffix("-unstable").unwrap_or(path).len();
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i <= 1 || bytes[i - 1] != b'v' || bytes[i - 2] != b'.' {
        return None;
    }
    let (prefix, major) = path.split_at(i - 2);
    if major.len() <= 2 || (major.as_bytes()[2] == b'0' && major != ".v0") {
        return None;
    }
    Some((prefix, major))
}

/// The trailing `vN` element of a slash-separated path, if any.
///
/// Looser than [`split_path_version`] so that mistakes such as `v0`, `v02`
/// or `v1.2` can be named in error messages.
pub fn dir_major_suffix(path: &str) -> &str {
    let bytes = path.as_bytes();
    let mut i = bytes.len();
    while i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
        i -= 1;
    }
    if i <= 1 || i == bytes.len() || bytes[i - 1] != b'v' || bytes[i - 2] != b'/' {
        return "";
    }
    &path[i - 1..]
}

/// Reject module paths that can never be released.
pub fn check_mod_path(path: &str) -> Result<()> {
    let invalid = |reason: &str| ApirelError::InvalidModulePath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if is_absolute(path) {
        return Err(invalid(
            "may not be an absolute path.\nIt must be an address where your module may be found.",
        ));
    }

    let suffix = dir_major_suffix(path);
    let suffix_error = |reason: &str| ApirelError::MajorSuffix {
        path: path.to_string(),
        suffix: suffix.to_string(),
        reason: reason.to_string(),
    };
    if suffix == "v0" || suffix == "v1" {
        return Err(suffix_error(
            "A major version suffix is only allowed for v2 or later.",
        ));
    } else if suffix.starts_with("v0") {
        return Err(suffix_error("A major version may not have a leading zero."));
    } else if suffix.contains('.') {
        return Err(suffix_error("A major version may not contain dots."));
    }

    if path.is_empty() {
        return Err(invalid("may not be empty"));
    }
    if let Some(c) = path
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "-._~/".contains(*c)))
    {
        return Err(invalid(&format!("contains invalid character {:?}", c)));
    }
    let elements: Vec<&str> = path.split('/').collect();
    if elements.iter().any(|e| e.is_empty()) {
        return Err(invalid("has an empty path element"));
    }
    if elements
        .iter()
        .any(|e| e.starts_with('.') || e.ends_with('.'))
    {
        return Err(invalid("has a path element that begins or ends with a dot"));
    }
    let first = elements[0];
    if !first.contains('.') {
        return Err(invalid("is missing a dot in its first path element"));
    }
    if first.starts_with('-') {
        return Err(invalid("has a leading dash in its first path element"));
    }
    if split_path_version(path).is_none() {
        return Err(invalid("has an invalid major version suffix"));
    }
    Ok(())
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 3
            && bytes[0].is_ascii_alphabetic()
            && bytes[1] == b':'
            && (bytes[2] == b'\\' || bytes[2] == b'/'))
}
