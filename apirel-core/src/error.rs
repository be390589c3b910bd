//! Error types for apirel-core.

use thiserror::Error;

/// Result type alias for apirel-core operations.
pub type Result<T> = std::result::Result<T, ApirelError>;

/// Errors that can occur while loading snapshots or evaluating versions.
///
/// The diff engine itself is total and never produces these; they come from
/// the edges: snapshot decoding, version strings and module paths.
#[derive(Error, Debug)]
pub enum ApirelError {
    /// Version string is not a semantic version of the form `vMAJOR.MINOR.PATCH`.
    #[error("version {version:?} is not a valid semantic version")]
    InvalidVersion {
        /// The rejected version string.
        version: String,
    },

    /// Version string parses but is not in canonical form.
    #[error("version {version:?} is not a canonical semantic version")]
    NonCanonicalVersion {
        /// The rejected version string.
        version: String,
    },

    /// Module path is malformed.
    #[error("module path {path:?} {reason}")]
    InvalidModulePath {
        /// The rejected module path.
        path: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// Module path carries a major version suffix that is not allowed.
    #[error("module path {path:?} has major version suffix {suffix:?}.\n{reason}")]
    MajorSuffix {
        /// The rejected module path.
        path: String,
        /// The offending suffix, e.g. `v1`.
        suffix: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A type reference points outside the snapshot's type arena.
    #[error("type reference {id} is out of range (arena has {len} types)")]
    DanglingType {
        /// The offending type id.
        id: u32,
        /// Number of types in the arena.
        len: usize,
    },

    /// The type graph contains a cycle that does not pass through a named type.
    #[error("package {package}: type graph contains a cycle without a named type")]
    UnanchoredCycle {
        /// Package whose declarations reach the cycle.
        package: String,
    },

    /// Release request is inconsistent, e.g. the base is not older than
    /// the proposed version.
    #[error("{message}")]
    InvalidRequest {
        /// Human-readable explanation.
        message: String,
    },

    /// A snapshot could not be obtained for a revision.
    #[error("could not load snapshot at revision {revision}: {message}")]
    Snapshot {
        /// Revision that was requested.
        revision: String,
        /// Description of the failure.
        message: String,
    },

    /// IO error reading snapshot files.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error for snapshot documents.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}
