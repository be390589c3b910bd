//! Change records produced by the declaration differ.

use serde::{Deserialize, Serialize};

use super::equivalence::Difference;

/// A single observable API change.
///
/// Changes are created once and never mutated; their order within a package
/// is symbol path first, detection order second.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Symbol path the change concerns, e.g. `Reader.Read`. Empty for
    /// package-level changes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Human-readable description.
    pub message: String,

    /// Whether existing callers keep working.
    pub compatible: bool,
}

impl Change {
    pub fn new(path: &str, message: &str, compatible: bool) -> Self {
        Self {
            path: path.to_string(),
            message: message.to_string(),
            compatible,
        }
    }

    /// A symbol that only exists in the new snapshot.
    pub fn added(path: &str) -> Self {
        Self::new(path, "added", true)
    }

    /// A symbol that only exists in the old snapshot.
    pub fn removed(path: &str) -> Self {
        Self::new(path, "removed", false)
    }

    /// Attach a type difference found inside the declaration `symbol`.
    pub fn from_difference(symbol: &str, diff: &Difference) -> Self {
        let mut path = symbol.to_string();
        for member in diff.members() {
            path.push('.');
            path.push_str(member);
        }
        Self {
            path,
            message: diff.describe(),
            compatible: diff.compatible,
        }
    }

    /// The one-line form used in text reports.
    pub fn line(&self) -> String {
        if self.path.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {}", self.path, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::equivalence::Segment;

    #[test]
    fn test_change_constructors() {
        let added = Change::added("NewReader");
        assert!(added.compatible);
        assert_eq!(added.line(), "NewReader: added");

        let removed = Change::removed("OldReader");
        assert!(!removed.compatible);
        assert_eq!(removed.line(), "OldReader: removed");

        let pkg = Change::new("", "package removed", false);
        assert_eq!(pkg.line(), "package removed");
    }

    #[test]
    fn test_change_from_difference() {
        let diff = Difference {
            location: vec![
                Segment::Member("Options".to_string()),
                Segment::Context("parameter 2".to_string()),
                Segment::Member("Timeout".to_string()),
            ],
            message: "changed from int to int64".to_string(),
            compatible: false,
        };

        let change = Change::from_difference("Config", &diff);
        assert_eq!(change.path, "Config.Options");
        assert_eq!(change.message, "parameter 2: Timeout: changed from int to int64");
        assert!(!change.compatible);
    }

    #[test]
    fn test_change_serializes_without_empty_path() {
        let json = serde_json::to_string(&Change::new("", "package added", true)).unwrap();
        assert_eq!(json, r#"{"message":"package added","compatible":true}"#);
    }
}
