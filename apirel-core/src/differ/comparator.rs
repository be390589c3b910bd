//! Declaration and package comparison.

use std::cmp::Ordering;

use crate::extract::{extract, Symbol, SymbolTable};
use crate::report::PackageReport;
use crate::types::{DeclKind, PackageDef, Snapshot};

use super::changes::Change;
use super::equivalence::{Engine, Position};

/// Compare the exported symbols of one package at two revisions.
///
/// Both tables are walked in name order; the result is sorted by symbol
/// path, keeping detection order for changes on the same path.
pub fn diff_symbols(old: &SymbolTable<'_>, new: &SymbolTable<'_>) -> Vec<Change> {
    let mut engine = Engine::new(old.snapshot, new.snapshot, new.package);
    let mut changes = Vec::new();

    let mut old_iter = old.symbols.iter().peekable();
    let mut new_iter = new.symbols.iter().peekable();
    loop {
        let order = match (old_iter.peek(), new_iter.peek()) {
            (Some(a), Some(b)) => a.name.cmp(&b.name),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => {
                if let Some(a) = old_iter.next() {
                    changes.push(Change::removed(&a.name));
                }
            }
            Ordering::Greater => {
                if let Some(b) = new_iter.next() {
                    changes.push(Change::added(&b.name));
                }
            }
            Ordering::Equal => {
                if let (Some(a), Some(b)) = (old_iter.next(), new_iter.next()) {
                    diff_symbol(&mut engine, a, b, &mut changes);
                }
            }
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    changes
}

fn diff_symbol(engine: &mut Engine<'_>, old: &Symbol, new: &Symbol, changes: &mut Vec<Change>) {
    if old.kind != new.kind {
        let message = format!(
            "changed from {} to {}",
            old.kind.as_str(),
            new.kind.as_str()
        );
        changes.push(Change::new(&old.name, &message, false));
        return;
    }

    let diffs = match old.kind {
        DeclKind::Type => engine.declared_type(old.ty, new.ty),
        DeclKind::Func => engine.function(old.ty, new.ty),
        DeclKind::Var => engine.differences(old.ty, new.ty, Position::Both),
        DeclKind::Const => engine.differences(old.ty, new.ty, Position::Output),
    };
    changes.extend(diffs.iter().map(|d| Change::from_difference(&old.name, d)));

    if old.kind == DeclKind::Const && old.value != new.value {
        let message = format!(
            "value changed from {} to {}",
            old.value.as_deref().unwrap_or("?"),
            new.value.as_deref().unwrap_or("?")
        );
        changes.push(Change::new(&old.name, &message, false));
    }
}

/// Compare one package present in both snapshots.
///
/// Load errors on either side, including an unusable type graph, are
/// recorded instead of comparing structure.
pub fn diff_package(
    old: &Snapshot,
    old_pkg: &PackageDef,
    new: &Snapshot,
    new_pkg: &PackageDef,
) -> PackageReport {
    let mut report = PackageReport::new(&new_pkg.path);
    match (extract(old, old_pkg), extract(new, new_pkg)) {
        (Ok(a), Ok(b)) => report.changes = diff_symbols(&a, &b),
        (a, b) => {
            report.old_errors = a.err().unwrap_or_default();
            report.new_errors = b.err().unwrap_or_default();
            tracing::debug!(
                package = %new_pkg.path,
                "load errors, skipping structural comparison"
            );
        }
    }
    report
}

/// Whether a package path has an `internal` element below the module root.
pub fn is_internal(module_path: &str, package_path: &str) -> bool {
    let rest = package_path
        .strip_prefix(module_path)
        .unwrap_or(package_path);
    rest.split('/').any(|element| element == "internal")
}

/// Compare every package of two snapshots, sorted by path.
///
/// Without an old snapshot only the new packages' errors are reported.
/// Internal packages are skipped unless they fail to load.
pub fn diff_packages(old: Option<&Snapshot>, new: &Snapshot) -> Vec<PackageReport> {
    let module = new.module_path.as_str();
    fn sorted(s: &Snapshot) -> Vec<&PackageDef> {
        let mut pkgs: Vec<&PackageDef> = s.packages.iter().collect();
        pkgs.sort_by(|a, b| a.path.cmp(&b.path));
        pkgs
    }
    let old_pkgs = old.map(sorted).unwrap_or_default();
    let new_pkgs = sorted(new);

    let mut reports = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < old_pkgs.len() || j < new_pkgs.len() {
        let order = match (old_pkgs.get(i), new_pkgs.get(j)) {
            (Some(a), Some(b)) => a.path.cmp(&b.path),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };

        match (order, old) {
            (Ordering::Less, Some(old)) => {
                let pkg = old_pkgs[i];
                i += 1;
                let internal = is_internal(module, &pkg.path);
                let errors = extract(old, pkg).err().unwrap_or_default();
                if internal && errors.is_empty() {
                    tracing::debug!(package = %pkg.path, "skipping internal package");
                    continue;
                }
                let mut report = PackageReport::new(&pkg.path);
                report.old_errors = errors;
                if !internal {
                    report.changes.push(Change::new("", "package removed", false));
                }
                reports.push(report);
            }
            (Ordering::Equal, Some(old)) => {
                let (a, b) = (old_pkgs[i], new_pkgs[j]);
                i += 1;
                j += 1;
                if is_internal(module, &b.path) {
                    let mut report = PackageReport::new(&b.path);
                    report.old_errors = extract(old, a).err().unwrap_or_default();
                    report.new_errors = extract(new, b).err().unwrap_or_default();
                    if report.has_errors() {
                        reports.push(report);
                    } else {
                        tracing::debug!(package = %b.path, "skipping internal package");
                    }
                    continue;
                }
                reports.push(diff_package(old, a, new, b));
            }
            _ => {
                let pkg = new_pkgs[j];
                j += 1;
                let internal = is_internal(module, &pkg.path);
                let errors = extract(new, pkg).err().unwrap_or_default();
                if internal && errors.is_empty() {
                    tracing::debug!(package = %pkg.path, "skipping internal package");
                    continue;
                }
                let mut report = PackageReport::new(&pkg.path);
                report.new_errors = errors;
                if !internal && old.is_some() {
                    report.changes.push(Change::new("", "package added", true));
                }
                reports.push(report);
            }
        }
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, MethodDef, TypeId, TypeNode};

    const PKG: &str = "example.com/m";

    fn make_func(s: &mut Snapshot, params: &[&str], results: &[&str]) -> TypeId {
        let params = params.iter().map(|p| s.basic(p)).collect();
        let results = results.iter().map(|r| s.basic(r)).collect();
        s.add_type(TypeNode::Signature {
            params,
            results,
            variadic: false,
        })
    }

    /// A package with a few functions, a struct type and a constant.
    fn make_snapshot(funcs: &[&str], field_type: &str, max: &str) -> Snapshot {
        let mut s = Snapshot::new(PKG);
        for name in funcs {
            let f = make_func(&mut s, &["string"], &["error"]);
            s.package_mut(PKG).declare(name, DeclKind::Func, f);
        }
        let field = s.basic(field_type);
        let body = s.add_type(TypeNode::Struct {
            fields: vec![FieldDef::new("Timeout", field)],
        });
        let config = s.named("example.com/m.Config");
        s.set_underlying(config, body);
        let int = s.basic("int");
        s.package_mut(PKG)
            .declare("Config", DeclKind::Type, config)
            .declare_const("Max", int, max);
        s
    }

    fn diff(old: &Snapshot, new: &Snapshot) -> Vec<Change> {
        let a = extract(old, &old.packages[0]).unwrap();
        let b = extract(new, &new.packages[0]).unwrap();
        diff_symbols(&a, &b)
    }

    #[test]
    fn test_reflexive() {
        let s = make_snapshot(&["Open", "Close"], "int", "10");
        assert!(diff(&s, &s).is_empty());
        let t = make_snapshot(&["Open", "Close"], "int", "10");
        assert!(diff(&s, &t).is_empty());
    }

    #[test]
    fn test_removed_function() {
        let old = make_snapshot(&["Open", "Close"], "int", "10");
        let new = make_snapshot(&["Open"], "int", "10");

        assert_eq!(diff(&old, &new), vec![Change::removed("Close")]);
    }

    #[test]
    fn test_added_function() {
        let old = make_snapshot(&["Open"], "int", "10");
        let new = make_snapshot(&["Open", "Close"], "int", "10");

        assert_eq!(diff(&old, &new), vec![Change::added("Close")]);
    }

    #[test]
    fn test_changes_sorted_by_path() {
        let old = make_snapshot(&["Open", "Reset"], "int", "10");
        let new = make_snapshot(&["Apply", "Open"], "string", "20");

        let paths: Vec<String> = diff(&old, &new).into_iter().map(|c| c.path).collect();
        assert_eq!(paths, vec!["Apply", "Config.Timeout", "Max", "Reset"]);
    }

    #[test]
    fn test_const_value_change() {
        let old = make_snapshot(&[], "int", "10");
        let new = make_snapshot(&[], "int", "20");

        assert_eq!(
            diff(&old, &new),
            vec![Change::new("Max", "value changed from 10 to 20", false)]
        );
    }

    #[test]
    fn test_kind_change() {
        let mut old = Snapshot::new(PKG);
        let f = make_func(&mut old, &[], &[]);
        old.package_mut(PKG).declare("Hook", DeclKind::Func, f);

        let mut new = Snapshot::new(PKG);
        let f = make_func(&mut new, &[], &[]);
        new.package_mut(PKG).declare("Hook", DeclKind::Var, f);

        assert_eq!(
            diff(&old, &new),
            vec![Change::new("Hook", "changed from func to var", false)]
        );
    }

    #[test]
    fn test_unexported_interface_gaining_method_breaks_parameter_site() {
        // type reader interface { ... }; func Wrap(reader) reader
        let make = |methods: &[&str]| {
            let mut s = Snapshot::new(PKG);
            let empty = make_func(&mut s, &[], &[]);
            let body = s.add_type(TypeNode::Interface {
                methods: methods.iter().map(|m| MethodDef::new(m, empty)).collect(),
                embedded: vec![],
            });
            let reader = s.named("example.com/m.reader");
            s.set_underlying(reader, body);
            let wrap = s.add_type(TypeNode::Signature {
                params: vec![reader],
                results: vec![reader],
                variadic: false,
            });
            s.package_mut(PKG).declare("Wrap", DeclKind::Func, wrap);
            s
        };
        let old = make(&["Read"]);
        let new = make(&["Close", "Read"]);

        let changes = diff(&old, &new);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.path == "Wrap"));
        assert!(changes.iter().any(|c| c.compatible));
        assert!(changes.iter().any(|c| !c.compatible));
    }

    #[test]
    fn test_method_changes_on_declared_type() {
        let make = |methods: &[&str]| {
            let mut s = Snapshot::new(PKG);
            let int = s.basic("int");
            let t = s.named("example.com/m.Counter");
            s.set_underlying(t, int);
            for m in methods {
                let sig = make_func(&mut s, &[], &["int"]);
                s.add_method(t, MethodDef::new(m, sig));
            }
            s.package_mut(PKG).declare("Counter", DeclKind::Type, t);
            s
        };
        let old = make(&["Inc", "Value"]);
        let new = make(&["Reset", "Value"]);

        assert_eq!(
            diff(&old, &new),
            vec![
                Change::new("Counter.Inc", "removed", false),
                Change::new("Counter.Reset", "added", true),
            ]
        );
    }

    #[test]
    fn test_is_internal() {
        assert!(is_internal(PKG, "example.com/m/internal"));
        assert!(is_internal(PKG, "example.com/m/a/internal/b"));
        assert!(!is_internal(PKG, "example.com/m/a"));
        assert!(!is_internal("example.com/internal/m", "example.com/internal/m/a"));
    }

    fn make_packages(paths: &[&str]) -> Snapshot {
        let mut s = Snapshot::new(PKG);
        let int = s.basic("int");
        for p in paths {
            s.package_mut(p).declare("X", DeclKind::Var, int);
        }
        s
    }

    #[test]
    fn test_diff_packages_added_and_removed() {
        let old = make_packages(&["example.com/m", "example.com/m/gone", "example.com/m/internal/x"]);
        let new = make_packages(&["example.com/m", "example.com/m/fresh", "example.com/m/internal/y"]);

        let reports = diff_packages(Some(&old), &new);
        let summary: Vec<(&str, Vec<String>)> = reports
            .iter()
            .map(|r| (r.path.as_str(), r.changes.iter().map(Change::line).collect()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("example.com/m", vec![]),
                ("example.com/m/fresh", vec!["package added".to_string()]),
                ("example.com/m/gone", vec!["package removed".to_string()]),
            ]
        );
    }

    #[test]
    fn test_diff_packages_without_base_reports_only_errors() {
        let mut new = make_packages(&["example.com/m", "example.com/m/internal/x"]);
        new.packages[1].errors.push("x.go:1:1: syntax error".to_string());

        let reports = diff_packages(None, &new);
        assert_eq!(reports.len(), 2);
        assert!(reports[0].changes.is_empty());
        assert_eq!(reports[1].path, "example.com/m/internal/x");
        assert_eq!(reports[1].new_errors, vec!["x.go:1:1: syntax error".to_string()]);
    }

    #[test]
    fn test_diff_packages_errors_skip_comparison() {
        let old = make_packages(&["example.com/m"]);
        let mut new = Snapshot::new(PKG);
        new.package_mut(PKG).errors.push("m.go:2:5: undefined: y".to_string());

        let reports = diff_packages(Some(&old), &new);
        assert_eq!(reports.len(), 1);
        assert!(reports[0].changes.is_empty());
        assert!(reports[0].old_errors.is_empty());
        assert_eq!(reports[0].new_errors.len(), 1);
    }

    #[test]
    fn test_diff_packages_internal_with_errors_is_reported() {
        let mut old = make_packages(&["example.com/m/internal/x"]);
        old.packages[0].errors.push("x.go:1:1: broken".to_string());
        let new = make_packages(&["example.com/m/internal/x"]);

        let reports = diff_packages(Some(&old), &new);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].old_errors, vec!["x.go:1:1: broken".to_string()]);
        assert!(reports[0].changes.is_empty());
    }
}
