//! Symbol table extraction.
//!
//! Turns one loaded package into the set of exported top-level symbols that
//! the differ compares by name. Unexported types reached from those symbols
//! are not symbols themselves: they are compared structurally wherever they
//! are referenced, but their names never act as comparison keys.

use std::collections::BTreeSet;

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use serde::Serialize;

use crate::error::ApirelError;
use crate::types::{is_exported, split_qualified, DeclKind, PackageDef, Snapshot, TypeId, TypeNode};

/// An exported top-level declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub package: String,
    pub name: String,
    pub kind: DeclKind,
    #[serde(rename = "type")]
    pub ty: TypeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Symbol {
    /// Package-qualified name, e.g. `example.com/m/pkg.Reader`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// Exported surface of one package, sorted by symbol name.
#[derive(Debug, Clone)]
pub struct SymbolTable<'a> {
    pub package: &'a str,
    pub snapshot: &'a Snapshot,
    pub symbols: Vec<Symbol>,
    /// Unexported named types whose structure is part of the exported API.
    pub reachable_unexported: BTreeSet<TypeId>,
}

impl<'a> SymbolTable<'a> {
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols
            .binary_search_by(|s| s.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.symbols[i])
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Short names of the reachable unexported types, for display.
    pub fn reachable_unexported_names(&self) -> Vec<String> {
        self.reachable_unexported
            .iter()
            .filter_map(|id| match self.snapshot.node(*id) {
                Some(TypeNode::Named { name, .. }) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Extract the exported symbols of `package`.
///
/// Returns the package's load errors instead of symbols when it failed to
/// load, or when its type graph is unusable. The snapshot must already have
/// passed [`Snapshot::validate`].
pub fn extract<'a>(
    snapshot: &'a Snapshot,
    package: &'a PackageDef,
) -> Result<SymbolTable<'a>, Vec<String>> {
    if package.has_errors() {
        return Err(package.errors.clone());
    }

    let mut symbols: Vec<Symbol> = package
        .declarations
        .iter()
        .filter(|d| is_exported(&d.name))
        .map(|d| Symbol {
            package: package.path.clone(),
            name: d.name.clone(),
            kind: d.kind,
            ty: d.ty,
            value: d.value.clone(),
        })
        .collect();
    symbols.sort_by(|a, b| a.name.cmp(&b.name));
    symbols.dedup_by(|a, b| a.name == b.name);

    let roots: Vec<TypeId> = symbols.iter().map(|s| s.ty).collect();
    let reachable = reachable_types(snapshot, &roots);

    if has_unanchored_cycle(snapshot, &reachable) {
        let err = ApirelError::UnanchoredCycle {
            package: package.path.clone(),
        };
        return Err(vec![err.to_string()]);
    }

    let reachable_unexported = reachable
        .into_iter()
        .filter(|id| match snapshot.node(*id) {
            Some(TypeNode::Named { name, .. }) => !is_exported(split_qualified(name).1),
            _ => false,
        })
        .collect();

    tracing::debug!(
        package = %package.path,
        symbols = symbols.len(),
        "extracted symbol table"
    );

    Ok(SymbolTable {
        package: &package.path,
        snapshot,
        symbols,
        reachable_unexported,
    })
}

/// Graph of the whole arena; edges follow `TypeNode::children`.
fn type_graph(snapshot: &Snapshot) -> DiGraph<TypeId, ()> {
    let mut graph = DiGraph::with_capacity(snapshot.types.len(), snapshot.types.len());
    for id in 0..snapshot.types.len() {
        graph.add_node(id as TypeId);
    }
    for (id, node) in snapshot.types.iter().enumerate() {
        for child in node.children() {
            if (child as usize) < snapshot.types.len() {
                graph.add_edge(NodeIndex::new(id), NodeIndex::new(child as usize), ());
            }
        }
    }
    graph
}

fn reachable_types(snapshot: &Snapshot, roots: &[TypeId]) -> BTreeSet<TypeId> {
    let graph = type_graph(snapshot);
    let mut seen = BTreeSet::new();
    for &root in roots {
        if root as usize >= graph.node_count() {
            continue;
        }
        let mut dfs = Dfs::new(&graph, NodeIndex::new(root as usize));
        while let Some(nx) = dfs.next(&graph) {
            seen.insert(graph[nx]);
        }
    }
    seen
}

/// Whether some cycle among `reachable` avoids every named type.
///
/// Named types are the only recursion anchors the comparison engine knows,
/// so dropping their out-edges must leave an acyclic graph.
fn has_unanchored_cycle(snapshot: &Snapshot, reachable: &BTreeSet<TypeId>) -> bool {
    let mut graph: DiGraph<TypeId, ()> = DiGraph::new();
    let index: std::collections::HashMap<TypeId, NodeIndex> = reachable
        .iter()
        .map(|&id| (id, graph.add_node(id)))
        .collect();
    for &id in reachable {
        let Some(node) = snapshot.node(id) else {
            continue;
        };
        if matches!(node, TypeNode::Named { .. }) {
            continue;
        }
        for child in node.children() {
            if let Some(&to) = index.get(&child) {
                graph.add_edge(index[&id], to, ());
            }
        }
    }
    is_cyclic_directed(&graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FieldDef, MethodDef};

    const PKG: &str = "example.com/m";

    fn make_snapshot() -> Snapshot {
        let mut s = Snapshot::new(PKG);
        let int = s.basic("int");

        // type node struct { Left, Right *node; Value int }
        let node = s.named("example.com/m.node");
        let node_ptr = s.add_type(TypeNode::Pointer { elem: node });
        let node_body = s.add_type(TypeNode::Struct {
            fields: vec![
                FieldDef::new("Left", node_ptr),
                FieldDef::new("Right", node_ptr),
                FieldDef::new("Value", int),
            ],
        });
        s.set_underlying(node, node_body);

        // type Tree struct { Root *node }
        let tree = s.named("example.com/m.Tree");
        let tree_body = s.add_type(TypeNode::Struct {
            fields: vec![FieldDef::new("Root", node_ptr)],
        });
        s.set_underlying(tree, tree_body);

        let sig = s.add_type(TypeNode::Signature {
            params: vec![int],
            results: vec![],
            variadic: false,
        });
        s.add_method(tree, MethodDef::new("Insert", sig));

        let helper = s.add_type(TypeNode::Signature {
            params: vec![],
            results: vec![],
            variadic: false,
        });

        s.package_mut(PKG)
            .declare("Tree", DeclKind::Type, tree)
            .declare("node", DeclKind::Type, node)
            .declare("helper", DeclKind::Func, helper)
            .declare_const("Max", int, "10");
        s
    }

    #[test]
    fn test_extract_exported_only() {
        let s = make_snapshot();
        let table = extract(&s, &s.packages[0]).unwrap();

        let names: Vec<&str> = table.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Max", "Tree"]);
        assert!(table.get("node").is_none());
        assert!(table.get("helper").is_none());
        assert_eq!(table.get("Max").unwrap().value.as_deref(), Some("10"));
        assert_eq!(table.get("Tree").unwrap().qualified_name(), "example.com/m.Tree");
    }

    #[test]
    fn test_extract_pulls_in_unexported_reachable_types() {
        let s = make_snapshot();
        let table = extract(&s, &s.packages[0]).unwrap();

        assert_eq!(table.reachable_unexported_names(), vec!["example.com/m.node"]);
    }

    #[test]
    fn test_extract_package_with_errors() {
        let mut s = make_snapshot();
        s.packages[0].errors.push("a.go:1:1: expected 'package'".to_string());

        let errors = extract(&s, &s.packages[0]).unwrap_err();
        assert_eq!(errors, vec!["a.go:1:1: expected 'package'".to_string()]);
    }

    #[test]
    fn test_extract_rejects_unanchored_cycle() {
        let mut s = Snapshot::new(PKG);
        // A slice whose element is itself, with no named type in between.
        let slice = s.add_type(TypeNode::Slice { elem: 0 });
        s.package_mut(PKG).declare("Loop", DeclKind::Var, slice);

        let errors = extract(&s, &s.packages[0]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cycle without a named type"));
    }

    #[test]
    fn test_extract_ignores_unreachable_cycles() {
        let mut s = Snapshot::new(PKG);
        let int = s.basic("int");
        s.add_type(TypeNode::Slice { elem: 1 });
        s.package_mut(PKG).declare("X", DeclKind::Var, int);

        let table = extract(&s, &s.packages[0]).unwrap();
        assert_eq!(table.len(), 1);
    }
}
