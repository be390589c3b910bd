//! API diff engine for comparing two snapshots of a library.
//!
//! The engine works in layers:
//!
//! - **Type equivalence** ([`equivalence`]): decides whether two types are
//!   identical, compatible or incompatible, honouring the direction in which
//!   values flow through a type.
//! - **Declarations** ([`comparator`]): walks the exported symbols of a
//!   package and turns type differences into [`Change`] records.
//! - **Packages** ([`comparator::diff_packages`]): pairs packages across
//!   snapshots and reports added, removed and broken packages.
//!
//! # Example
//!
//! ```no_run
//! use apirel_core::differ::diff_packages;
//! use apirel_core::types::Snapshot;
//!
//! # fn main() -> apirel_core::Result<()> {
//! let old = Snapshot::from_path("old.json".as_ref())?;
//! let new = Snapshot::from_path("new.json".as_ref())?;
//! for package in diff_packages(Some(&old), &new) {
//!     for change in package.incompatible_changes() {
//!         println!("BREAKING {}: {}", package.path, change.line());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod changes;
pub mod comparator;
pub mod equivalence;
pub mod typestring;

pub use changes::Change;
pub use comparator::{diff_package, diff_packages, diff_symbols, is_internal};
pub use equivalence::{compare_types, Difference, Engine, Position, Verdict};
