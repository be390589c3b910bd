//! apirel core - API diffing and semantic version policy for libraries.
//!
//! This crate compares the exported surface of a library at two revisions
//! and decides which version the new revision may carry.
//!
//! # Features
//!
//! - **Snapshot model**: a flat type arena per revision, loaded from JSON
//! - **Symbol extraction**: exported declarations plus validation of the
//!   type graph
//! - **Direction-aware type equivalence**: interface method sets are judged
//!   per usage site, recursive types terminate
//! - **Change reports**: per-package compatible and incompatible changes
//! - **Version policy**: suggest the next version or validate a proposed one
//!
//! # Usage
//!
//! ```no_run
//! use apirel_core::{build_report, ReleaseRequest, Snapshot};
//!
//! # fn main() -> apirel_core::Result<()> {
//! let old = Snapshot::from_path("v1.2.0.json".as_ref())?;
//! let new = Snapshot::from_path("head.json".as_ref())?;
//! let request = ReleaseRequest::new(Some("v1.2.0"), None);
//!
//! let report = build_report(&request, Some(&old), &new)?;
//! print!("{}", report);
//! # Ok(())
//! # }
//! ```

pub mod differ;
pub mod error;
pub mod extract;
pub mod modpath;
pub mod policy;
pub mod release;
pub mod report;
pub mod types;
pub mod version;

pub use differ::{diff_packages, Change};
pub use error::{ApirelError, Result};
pub use extract::{extract, Symbol, SymbolTable};
pub use policy::Rejection;
pub use release::{build_report, check_release, ReleaseRequest, SnapshotProvider};
pub use report::{PackageReport, Report};
pub use types::{DeclKind, Snapshot, TypeId, TypeNode};
pub use version::Version;
