//! Render type nodes as source-like strings for change messages.

use crate::types::{split_qualified, Snapshot, TypeId, TypeNode};

/// Nesting limit for printing; named types never expand, so only
/// pathological documents get near it.
const MAX_DEPTH: usize = 24;

/// Format `id` the way a reader of package `package` would write it:
/// types from that package are unqualified, others use the last path
/// element of their package.
pub fn type_string(snapshot: &Snapshot, id: TypeId, package: &str) -> String {
    let mut out = String::new();
    write_type(&mut out, snapshot, id, package, 0);
    out
}

/// Format a signature without the leading `func` keyword, as it appears in
/// an interface or method listing.
pub fn signature_string(snapshot: &Snapshot, id: TypeId, package: &str) -> String {
    let mut out = String::new();
    match snapshot.node(id) {
        Some(TypeNode::Signature {
            params,
            results,
            variadic,
        }) => write_signature(&mut out, snapshot, params, results, *variadic, package, 0),
        _ => write_type(&mut out, snapshot, id, package, 0),
    }
    out
}

/// Format a parenthesized type list such as a result tuple.
pub fn tuple_string(snapshot: &Snapshot, ids: &[TypeId], package: &str) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| type_string(snapshot, *id, package))
        .collect();
    format!("({})", items.join(", "))
}

/// Shorten a qualified name relative to `package`.
pub fn relative_name(name: &str, package: &str) -> String {
    let (pkg, short) = split_qualified(name);
    if pkg.is_empty() || pkg == package {
        short.to_string()
    } else {
        let last = pkg.rsplit('/').next().unwrap_or(pkg);
        format!("{}.{}", last, short)
    }
}

fn write_type(out: &mut String, s: &Snapshot, id: TypeId, package: &str, depth: usize) {
    if depth > MAX_DEPTH {
        out.push('…');
        return;
    }
    let Some(node) = s.node(id) else {
        out.push_str("<invalid>");
        return;
    };
    match node {
        TypeNode::Basic { name } => out.push_str(name),
        TypeNode::Named { name, .. } | TypeNode::Alias { name, .. } => {
            out.push_str(&relative_name(name, package))
        }
        TypeNode::Pointer { elem } => {
            out.push('*');
            write_type(out, s, *elem, package, depth + 1);
        }
        TypeNode::Array { len, elem } => {
            out.push_str(&format!("[{}]", len));
            write_type(out, s, *elem, package, depth + 1);
        }
        TypeNode::Slice { elem } => {
            out.push_str("[]");
            write_type(out, s, *elem, package, depth + 1);
        }
        TypeNode::Map { key, value } => {
            out.push_str("map[");
            write_type(out, s, *key, package, depth + 1);
            out.push(']');
            write_type(out, s, *value, package, depth + 1);
        }
        TypeNode::Struct { fields } => {
            out.push_str("struct{");
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str("; ");
                }
                if !f.embedded {
                    out.push_str(&f.name);
                    out.push(' ');
                }
                write_type(out, s, f.ty, package, depth + 1);
            }
            out.push('}');
        }
        TypeNode::Interface { methods, embedded } => {
            out.push_str("interface{");
            let mut first = true;
            for e in embedded {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                write_type(out, s, *e, package, depth + 1);
            }
            for m in methods {
                if !first {
                    out.push_str("; ");
                }
                first = false;
                out.push_str(&m.name);
                match s.node(m.signature) {
                    Some(TypeNode::Signature {
                        params,
                        results,
                        variadic,
                    }) => write_signature(out, s, params, results, *variadic, package, depth + 1),
                    _ => out.push_str("()"),
                }
            }
            out.push('}');
        }
        TypeNode::Signature {
            params,
            results,
            variadic,
        } => {
            out.push_str("func");
            write_signature(out, s, params, results, *variadic, package, depth + 1);
        }
    }
}

fn write_signature(
    out: &mut String,
    s: &Snapshot,
    params: &[TypeId],
    results: &[TypeId],
    variadic: bool,
    package: &str,
    depth: usize,
) {
    out.push('(');
    for (i, p) in params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let last = i + 1 == params.len();
        match (variadic && last, s.node(*p)) {
            (true, Some(TypeNode::Slice { elem })) => {
                out.push_str("...");
                write_type(out, s, *elem, package, depth + 1);
            }
            _ => write_type(out, s, *p, package, depth + 1),
        }
    }
    out.push(')');
    match results.len() {
        0 => {}
        1 if !matches!(s.node(results[0]), Some(TypeNode::Signature { .. })) => {
            out.push(' ');
            write_type(out, s, results[0], package, depth + 1);
        }
        _ => {
            out.push_str(" (");
            for (i, r) in results.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_type(out, s, *r, package, depth + 1);
            }
            out.push(')');
        }
    }
}
