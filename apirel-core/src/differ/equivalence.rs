//! Type equivalence engine.
//!
//! Compares a type from the old snapshot with a type from the new snapshot
//! and lists every observable difference, each with its own compatibility
//! flag. Named types are the only recursion point: exported names act as
//! identities, while unexported named types are unfolded structurally. A
//! currently-comparing set of `(old, new)` pairs stops the unfolding of
//! self-referential types; a pair leaves the set once its comparison returns.
//!
//! Interfaces are direction sensitive. Every occurrence carries a
//! [`Position`]: a method added to an interface that callers pass in breaks
//! them, a method removed from an interface that callers receive breaks them,
//! and the opposite changes are harmless at that site.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;

use super::typestring::{relative_name, tuple_string, type_string};
use crate::types::{is_exported, split_qualified, MethodDef, Snapshot, TypeId, TypeNode};

const MAX_ALIAS_CHAIN: usize = 32;

/// Which way values of a type flow between the library and its callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    /// Supplied by the caller, e.g. a function parameter.
    Input,
    /// Handed to the caller, e.g. a function result.
    Output,
    /// Both read and written by callers, e.g. a struct field or a variable.
    Both,
}

impl Position {
    /// Position seen from inside a function parameter.
    pub fn flip(self) -> Self {
        match self {
            Position::Input => Position::Output,
            Position::Output => Position::Input,
            Position::Both => Position::Both,
        }
    }

    /// Whether an interface at this position may gain methods.
    fn tolerates_addition(self) -> bool {
        self == Position::Output
    }

    /// Whether an interface at this position may lose methods.
    fn tolerates_removal(self) -> bool {
        self == Position::Input
    }
}

/// One step of the path from a declaration to a difference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// A field or method selector.
    Member(String),
    /// An inline location such as `parameter 1` or `element`.
    Context(String),
}

impl Segment {
    fn as_str(&self) -> &str {
        match self {
            Segment::Member(s) | Segment::Context(s) => s,
        }
    }
}

/// A single observable difference between two types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference {
    pub location: Vec<Segment>,
    pub message: String,
    pub compatible: bool,
}

impl Difference {
    /// Selectors that lead the location, e.g. `["Config", "Timeout"]`
    /// becomes part of the change path `Config.Timeout`.
    pub fn members(&self) -> Vec<&str> {
        self.location
            .iter()
            .take_while(|s| matches!(s, Segment::Member(_)))
            .map(Segment::as_str)
            .collect()
    }

    /// Message prefixed with the inline part of the location.
    pub fn describe(&self) -> String {
        let lead = self.members().len();
        let mut parts: Vec<&str> = self.location[lead..].iter().map(Segment::as_str).collect();
        parts.push(&self.message);
        parts.join(": ")
    }
}

/// Summary of a comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Identical,
    Compatible(String),
    Incompatible(String),
}

impl Verdict {
    /// Fold differences into the most severe verdict.
    pub fn from_differences(diffs: &[Difference]) -> Self {
        if let Some(d) = diffs.iter().find(|d| !d.compatible) {
            Verdict::Incompatible(d.describe())
        } else if let Some(d) = diffs.first() {
            Verdict::Compatible(d.describe())
        } else {
            Verdict::Identical
        }
    }

    pub fn is_identical(&self) -> bool {
        matches!(self, Verdict::Identical)
    }
}

/// Compare two types from different snapshots at the given position.
pub fn compare_types(
    old: &Snapshot,
    new: &Snapshot,
    package: &str,
    old_ty: TypeId,
    new_ty: TypeId,
    position: Position,
) -> Verdict {
    let mut engine = Engine::new(old, new, package);
    Verdict::from_differences(&engine.differences(old_ty, new_ty, position))
}

#[derive(Clone, Copy)]
enum MethodEntry {
    Method(TypeId),
    /// An embedded interface from outside the library, known only by name.
    Opaque,
}

struct VisibleField {
    ty: TypeId,
    embedded: bool,
}

/// Comparison state for one package pair.
pub struct Engine<'a> {
    old: &'a Snapshot,
    new: &'a Snapshot,
    package: &'a str,
    visited: HashSet<(TypeId, TypeId)>,
    location: Vec<Segment>,
    found: Vec<Difference>,
}

impl<'a> Engine<'a> {
    /// `package` qualifies type names in messages.
    pub fn new(old: &'a Snapshot, new: &'a Snapshot, package: &'a str) -> Self {
        Self {
            old,
            new,
            package,
            visited: HashSet::new(),
            location: Vec::new(),
            found: Vec::new(),
        }
    }

    /// Differences between two types occurring at `position`.
    pub fn differences(&mut self, old: TypeId, new: TypeId, position: Position) -> Vec<Difference> {
        self.reset();
        self.diff(old, new, position);
        std::mem::take(&mut self.found)
    }

    /// Differences between two declarations of the same type name.
    ///
    /// The declared structure is unfolded one level even for exported names,
    /// and interface method sets follow the declaration rule: additions
    /// break implementers, removals do not.
    pub fn declared_type(&mut self, old: TypeId, new: TypeId) -> Vec<Difference> {
        self.reset();
        self.declaration(old, new);
        std::mem::take(&mut self.found)
    }

    /// Differences between two top-level function signatures.
    pub fn function(&mut self, old: TypeId, new: TypeId) -> Vec<Difference> {
        self.reset();
        self.signatures(old, new, Position::Output, true);
        std::mem::take(&mut self.found)
    }

    fn reset(&mut self) {
        self.visited.clear();
        self.location.clear();
        self.found.clear();
    }

    fn old_node(&self, id: TypeId) -> Option<&'a TypeNode> {
        self.old.node(id)
    }

    fn new_node(&self, id: TypeId) -> Option<&'a TypeNode> {
        self.new.node(id)
    }

    fn report(&mut self, compatible: bool, message: String) {
        self.found.push(Difference {
            location: self.location.clone(),
            message,
            compatible,
        });
    }

    fn changed(&mut self, old: TypeId, new: TypeId) {
        let message = format!(
            "changed from {} to {}",
            type_string(self.old, old, self.package),
            type_string(self.new, new, self.package)
        );
        self.report(false, message);
    }

    fn within(&mut self, segment: Segment, f: impl FnOnce(&mut Self)) {
        self.location.push(segment);
        f(self);
        self.location.pop();
    }

    fn diff(&mut self, old: TypeId, new: TypeId, pos: Position) {
        let (o, _) = resolve(self.old, old);
        let (n, _) = resolve(self.new, new);
        let (Some(on), Some(nn)) = (self.old_node(o), self.new_node(n)) else {
            self.changed(old, new);
            return;
        };

        match (on, nn) {
            (TypeNode::Basic { name: a }, TypeNode::Basic { name: b }) => {
                if a != b {
                    self.changed(old, new);
                }
            }
            (TypeNode::Named { .. }, TypeNode::Named { .. }) => self.named_use(old, new, pos),
            (TypeNode::Pointer { elem: a }, TypeNode::Pointer { elem: b }) => self.diff(*a, *b, pos),
            (TypeNode::Array { len: la, elem: a }, TypeNode::Array { len: lb, elem: b }) => {
                if la != lb {
                    self.changed(old, new);
                } else {
                    let (a, b) = (*a, *b);
                    self.within(Segment::Context("element".into()), |e| e.diff(a, b, pos));
                }
            }
            (TypeNode::Slice { elem: a }, TypeNode::Slice { elem: b }) => {
                let (a, b) = (*a, *b);
                self.within(Segment::Context("element".into()), |e| e.diff(a, b, pos));
            }
            (
                TypeNode::Map { key: ka, value: va },
                TypeNode::Map { key: kb, value: vb },
            ) => {
                let (ka, kb, va, vb) = (*ka, *kb, *va, *vb);
                self.within(Segment::Context("key".into()), |e| e.diff(ka, kb, pos));
                self.within(Segment::Context("value".into()), |e| e.diff(va, vb, pos));
            }
            (TypeNode::Struct { .. }, TypeNode::Struct { .. }) => self.structs(o, n),
            (TypeNode::Interface { .. }, TypeNode::Interface { .. }) => {
                self.interfaces(o, n, pos, pos)
            }
            (TypeNode::Signature { .. }, TypeNode::Signature { .. }) => {
                self.signatures(o, n, pos, false)
            }
            _ => self.changed(old, new),
        }
    }

    /// A named type referenced from somewhere else.
    fn named_use(&mut self, old: TypeId, new: TypeId, pos: Position) {
        let (o, old_alias) = resolve(self.old, old);
        let (n, new_alias) = resolve(self.new, new);
        let (Some(TypeNode::Named { name: a, .. }), Some(TypeNode::Named { name: b, .. })) =
            (self.old_node(o), self.new_node(n))
        else {
            self.changed(old, new);
            return;
        };

        let visible = is_exported(split_qualified(a).1) || is_exported(split_qualified(b).1);
        if !visible {
            // Callers never spell an unexported name, only its structure.
            self.unfold(o, n, pos);
            return;
        }
        if a == b {
            self.interface_site(o, n, a, pos);
            return;
        }
        let same_spelling = old_alias == Some(b.as_str())
            || new_alias == Some(a.as_str())
            || (old_alias.is_some() && old_alias == new_alias);
        if same_spelling {
            self.unfold(o, n, pos);
        } else {
            self.changed(old, new);
        }
    }

    /// Compare the definitions behind two named types.
    ///
    /// A pair already being compared further up the stack counts as equal.
    /// The pair is released on return so later sites, possibly in the other
    /// direction, get their own verdict.
    fn unfold(&mut self, o: TypeId, n: TypeId, pos: Position) {
        if !self.visited.insert((o, n)) {
            return;
        }
        self.unfold_definitions(o, n, pos);
        self.visited.remove(&(o, n));
    }

    fn unfold_definitions(&mut self, o: TypeId, n: TypeId, pos: Position) {
        let (
            Some(TypeNode::Named {
                name: a,
                underlying: ua,
                methods: ma,
            }),
            Some(TypeNode::Named {
                name: b,
                underlying: ub,
                methods: mb,
            }),
        ) = (self.old_node(o), self.new_node(n))
        else {
            return;
        };

        match (ua, ub) {
            (Some(ua), Some(ub)) => self.diff(*ua, *ub, pos),
            (None, None) if a == b => {}
            _ => self.changed(o, n),
        }
        self.concrete_methods(ma, mb);
    }

    fn declaration(&mut self, old: TypeId, new: TypeId) {
        let (o, _) = resolve(self.old, old);
        let (n, _) = resolve(self.new, new);
        let (
            Some(TypeNode::Named {
                name: a,
                underlying: ua,
                methods: ma,
            }),
            Some(TypeNode::Named {
                name: b,
                underlying: ub,
                methods: mb,
            }),
        ) = (self.old_node(o), self.new_node(n))
        else {
            self.diff(old, new, Position::Both);
            return;
        };

        self.visited.insert((o, n));
        match (ua, ub) {
            (Some(ua), Some(ub)) => {
                let (ua, ub) = (*ua, *ub);
                let both_interfaces = matches!(
                    (self.old_node(ua), self.new_node(ub)),
                    (Some(TypeNode::Interface { .. }), Some(TypeNode::Interface { .. }))
                );
                if both_interfaces {
                    self.interfaces(ua, ub, Position::Input, Position::Both);
                } else {
                    self.diff(ua, ub, Position::Both);
                }
            }
            (None, None) if a == b => {}
            _ => self.changed(old, new),
        }
        self.concrete_methods(ma, mb);
    }

    /// Exported methods declared on a named type.
    fn concrete_methods(&mut self, old: &[MethodDef], new: &[MethodDef]) {
        let exported = |methods: &[MethodDef]| -> BTreeMap<String, TypeId> {
            methods
                .iter()
                .filter(|m| is_exported(&m.name))
                .map(|m| (m.name.clone(), m.signature))
                .collect()
        };
        let old = exported(old);
        let mut new = exported(new);

        for (name, a) in old {
            match new.remove(&name) {
                Some(b) => self.within(Segment::Member(name), |e| {
                    e.signatures(a, b, Position::Output, true)
                }),
                None => self.within(Segment::Member(name), |e| {
                    e.report(false, "removed".to_string())
                }),
            }
        }
        for name in new.into_keys() {
            self.within(Segment::Member(name), |e| e.report(true, "added".to_string()));
        }
    }

    /// Method set changes of an exported interface at one usage site.
    fn interface_site(&mut self, o: TypeId, n: TypeId, name: &str, pos: Position) {
        let is_interface = |s: &Snapshot, id: TypeId| match s.node(id) {
            Some(TypeNode::Named {
                underlying: Some(u),
                ..
            }) => matches!(s.node(*u), Some(TypeNode::Interface { .. })),
            _ => false,
        };
        if !is_interface(self.old, o) || !is_interface(self.new, n) {
            return;
        }

        let old = method_set(self.old, o);
        let new = method_set(self.new, n);
        let label = |key: &String| match (old.get(key), new.get(key)) {
            (Some(MethodEntry::Opaque), _) | (_, Some(MethodEntry::Opaque)) => {
                format!("embedded {}", relative_name(key, self.package))
            }
            _ => key.clone(),
        };
        let added: Vec<String> = new
            .keys()
            .filter(|k| !old.contains_key(*k))
            .map(label)
            .collect();
        let removed: Vec<String> = old
            .keys()
            .filter(|k| !new.contains_key(*k))
            .map(label)
            .collect();

        let short = relative_name(name, self.package);
        if !added.is_empty() {
            let message = format!("{} gained {}", short, method_list(&added));
            self.report(pos.tolerates_addition(), message);
        }
        if !removed.is_empty() {
            let message = format!("{} lost {}", short, method_list(&removed));
            self.report(pos.tolerates_removal(), message);
        }
    }

    /// Compare two interface bodies. `set_pos` decides how method set
    /// changes count; `sig_pos` is passed to the shared methods' signatures.
    fn interfaces(&mut self, o: TypeId, n: TypeId, set_pos: Position, sig_pos: Position) {
        let old = method_set(self.old, o);
        let mut new = method_set(self.new, n);

        for (name, a) in old {
            match (a, new.remove(&name)) {
                (MethodEntry::Method(a), Some(MethodEntry::Method(b))) => {
                    self.within(Segment::Member(name), |e| e.signatures(a, b, sig_pos, false))
                }
                (MethodEntry::Opaque, Some(MethodEntry::Opaque)) => {}
                (_, Some(_)) => self.within(Segment::Member(name), |e| {
                    e.report(false, "changed between method and embedded interface".to_string())
                }),
                (MethodEntry::Method(_), None) => self.within(Segment::Member(name), |e| {
                    e.report(set_pos.tolerates_removal(), "removed".to_string())
                }),
                (MethodEntry::Opaque, None) => {
                    let message =
                        format!("embedded {} removed", relative_name(&name, self.package));
                    self.report(set_pos.tolerates_removal(), message);
                }
            }
        }
        for (name, b) in new {
            match b {
                MethodEntry::Method(_) => self.within(Segment::Member(name), |e| {
                    e.report(set_pos.tolerates_addition(), "added".to_string())
                }),
                MethodEntry::Opaque => {
                    let message = format!("embedded {} added", relative_name(&name, self.package));
                    self.report(set_pos.tolerates_addition(), message);
                }
            }
        }
    }

    /// Compare two signatures. A trailing variadic parameter may be added to
    /// `callable` declarations only: existing call sites still compile, but
    /// func values and interface implementations would not.
    fn signatures(&mut self, o: TypeId, n: TypeId, pos: Position, callable: bool) {
        let (
            Some(TypeNode::Signature {
                params: op,
                results: or,
                variadic: ov,
            }),
            Some(TypeNode::Signature {
                params: np,
                results: nr,
                variadic: nv,
            }),
        ) = (self.old_node(o), self.new_node(n))
        else {
            self.changed(o, n);
            return;
        };

        if or.len() != nr.len() {
            let message = format!(
                "results changed from {} to {}",
                tuple_string(self.old, or, self.package),
                tuple_string(self.new, nr, self.package)
            );
            self.report(false, message);
        } else {
            for (i, (a, b)) in or.iter().zip(nr.iter()).enumerate() {
                let (a, b) = (*a, *b);
                self.within(Segment::Context(format!("result {}", i + 1)), |e| e.diff(a, b, pos));
            }
        }

        let inner = pos.flip();
        let same_shape = op.len() == np.len() && ov == nv;
        let added_variadic = callable && !ov && *nv && np.len() == op.len() + 1;
        if same_shape || added_variadic {
            for (i, (a, b)) in op.iter().zip(np.iter()).enumerate() {
                let (a, b) = (*a, *b);
                self.within(Segment::Context(format!("parameter {}", i + 1)), |e| {
                    e.diff(a, b, inner)
                });
            }
        }
        if added_variadic {
            let last = np[np.len() - 1];
            let elem = match self.new_node(last) {
                Some(TypeNode::Slice { elem }) => *elem,
                _ => last,
            };
            let message = format!(
                "added variadic parameter ...{}",
                type_string(self.new, elem, self.package)
            );
            self.report(true, message);
        } else if !same_shape {
            self.changed(o, n);
        }
    }

    fn structs(&mut self, o: TypeId, n: TypeId) {
        let old = visible_fields(self.old, o);
        let mut new = visible_fields(self.new, n);

        for (name, a) in old {
            let Some(b) = new.remove(&name) else {
                self.within(Segment::Member(name), |e| e.report(false, "removed".to_string()));
                continue;
            };
            self.within(Segment::Member(name), |e| {
                if a.embedded != b.embedded {
                    let message = if a.embedded {
                        "changed from embedded to named field"
                    } else {
                        "changed from named to embedded field"
                    };
                    e.report(false, message.to_string());
                }
                e.diff(a.ty, b.ty, Position::Both);
            });
        }
        for name in new.into_keys() {
            self.within(Segment::Member(name), |e| e.report(true, "added".to_string()));
        }
    }
}

/// Follow alias nodes to the type they name, returning the first alias name.
fn resolve(snapshot: &Snapshot, id: TypeId) -> (TypeId, Option<&str>) {
    let mut current = id;
    let mut alias = None;
    for _ in 0..MAX_ALIAS_CHAIN {
        match snapshot.node(current) {
            Some(TypeNode::Alias { name, aliased }) => {
                alias.get_or_insert(name.as_str());
                current = *aliased;
            }
            _ => break,
        }
    }
    (current, alias)
}

/// Flattened method set of an interface, including embedded interfaces.
fn method_set(snapshot: &Snapshot, id: TypeId) -> BTreeMap<String, MethodEntry> {
    fn collect(
        s: &Snapshot,
        id: TypeId,
        set: &mut BTreeMap<String, MethodEntry>,
        seen: &mut HashSet<TypeId>,
    ) {
        if !seen.insert(id) {
            return;
        }
        match s.node(id) {
            Some(TypeNode::Interface { methods, embedded }) => {
                for m in methods {
                    set.entry(m.name.clone())
                        .or_insert(MethodEntry::Method(m.signature));
                }
                for e in embedded {
                    collect(s, *e, set, seen);
                }
            }
            Some(TypeNode::Named {
                underlying: Some(u),
                ..
            }) => collect(s, *u, set, seen),
            Some(TypeNode::Named {
                name,
                underlying: None,
                ..
            }) => {
                set.insert(name.clone(), MethodEntry::Opaque);
            }
            Some(TypeNode::Alias { aliased, .. }) => collect(s, *aliased, set, seen),
            _ => {}
        }
    }

    let mut set = BTreeMap::new();
    collect(snapshot, id, &mut set, &mut HashSet::new());
    set
}

fn method_list(names: &[String]) -> String {
    match names {
        [one] => format!("method {}", one),
        many => format!("methods {}", many.join(", ")),
    }
}

/// Exported fields selectable on a struct, including promoted ones.
///
/// Fields are gathered breadth-first through embedded structs (and pointers
/// to them). The shallowest depth wins; two fields with the same name at the
/// shallowest depth are ambiguous and not selectable at all.
fn visible_fields(snapshot: &Snapshot, id: TypeId) -> BTreeMap<String, VisibleField> {
    let mut candidates: BTreeMap<String, (usize, usize, VisibleField)> = BTreeMap::new();
    let mut queue = VecDeque::from([(id, 0usize)]);
    // First depth each struct was expanded at. The same struct embedded
    // twice at one depth is expanded twice so its fields collide.
    let mut expanded: HashMap<TypeId, usize> = HashMap::new();

    while let Some((current, depth)) = queue.pop_front() {
        if *expanded.entry(current).or_insert(depth) < depth {
            continue;
        }
        let Some(TypeNode::Struct { fields }) = snapshot.node(current) else {
            continue;
        };
        for f in fields {
            if f.is_exported() {
                let entry = candidates.entry(f.name.clone()).or_insert((
                    depth,
                    0,
                    VisibleField {
                        ty: f.ty,
                        embedded: f.embedded,
                    },
                ));
                if entry.0 == depth {
                    entry.1 += 1;
                }
            }
            if f.embedded {
                if let Some(inner) = embedded_struct(snapshot, f.ty) {
                    queue.push_back((inner, depth + 1));
                }
            }
        }
    }

    candidates
        .into_iter()
        .filter(|(_, (_, count, _))| *count == 1)
        .map(|(name, (_, _, field))| (name, field))
        .collect()
}

/// Struct body behind an embedded field type (`T`, `*T` or an alias of either).
fn embedded_struct(snapshot: &Snapshot, ty: TypeId) -> Option<TypeId> {
    let (mut current, _) = resolve(snapshot, ty);
    if let Some(TypeNode::Pointer { elem }) = snapshot.node(current) {
        current = resolve(snapshot, *elem).0;
    }
    if let Some(TypeNode::Named {
        underlying: Some(u),
        ..
    }) = snapshot.node(current)
    {
        current = *u;
    }
    match snapshot.node(current) {
        Some(TypeNode::Struct { .. }) => Some(current),
        _ => None,
    }
}
