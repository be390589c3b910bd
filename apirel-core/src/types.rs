//! Data models for library snapshots.
//!
//! A snapshot is the fully loaded, type-checked view of every package in a
//! library at one revision. Types live in a flat arena and refer to each
//! other by [`TypeId`], so recursive and mutually recursive types are plain
//! index cycles. Only `Named` nodes may close a cycle.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

use crate::error::{ApirelError, Result};

/// Index of a type node in a snapshot's type arena.
pub type TypeId = u32;

/// Returns whether an identifier is visible outside its package.
///
/// Visibility is decided by the first character alone: an upper-case first
/// letter means exported. The rule applies at every level (package-level
/// declarations, struct fields, methods).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Splits a qualified type name (`example.com/m/pkg.Name`) into its package
/// path and short name. Names without a qualifier return an empty package.
pub fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    }
}

/// A struct field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeId,
    #[serde(default)]
    pub embedded: bool,
}

impl FieldDef {
    pub fn new(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.to_string(),
            ty,
            embedded: false,
        }
    }

    pub fn embedded(name: &str, ty: TypeId) -> Self {
        Self {
            name: name.to_string(),
            ty,
            embedded: true,
        }
    }

    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// A method, either declared on a named type or listed in an interface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    /// Always refers to a `Signature` node.
    pub signature: TypeId,
}

impl MethodDef {
    pub fn new(name: &str, signature: TypeId) -> Self {
        Self {
            name: name.to_string(),
            signature,
        }
    }
}

/// One node of the type graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    /// Predeclared primitive such as `int`, `string` or `error`.
    Basic { name: String },
    /// A type with its own identity. `underlying` is absent for opaque
    /// types that live outside the library.
    Named {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        underlying: Option<TypeId>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        methods: Vec<MethodDef>,
    },
    /// A second name for an existing type.
    Alias { name: String, aliased: TypeId },
    Pointer { elem: TypeId },
    Array { len: u64, elem: TypeId },
    Slice { elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Struct {
        #[serde(default)]
        fields: Vec<FieldDef>,
    },
    Interface {
        #[serde(default)]
        methods: Vec<MethodDef>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        embedded: Vec<TypeId>,
    },
    Signature {
        #[serde(default)]
        params: Vec<TypeId>,
        #[serde(default)]
        results: Vec<TypeId>,
        #[serde(default)]
        variadic: bool,
    },
}

impl TypeNode {
    /// Short category label used in change messages.
    pub fn category(&self) -> &'static str {
        match self {
            TypeNode::Basic { .. } => "basic type",
            TypeNode::Named { .. } => "named type",
            TypeNode::Alias { .. } => "alias",
            TypeNode::Pointer { .. } => "pointer",
            TypeNode::Array { .. } => "array",
            TypeNode::Slice { .. } => "slice",
            TypeNode::Map { .. } => "map",
            TypeNode::Struct { .. } => "struct",
            TypeNode::Interface { .. } => "interface",
            TypeNode::Signature { .. } => "func",
        }
    }

    /// Type ids this node refers to directly.
    pub fn children(&self) -> Vec<TypeId> {
        match self {
            TypeNode::Basic { .. } => Vec::new(),
            TypeNode::Named {
                underlying,
                methods,
                ..
            } => underlying
                .iter()
                .copied()
                .chain(methods.iter().map(|m| m.signature))
                .collect(),
            TypeNode::Alias { aliased, .. } => vec![*aliased],
            TypeNode::Pointer { elem } | TypeNode::Array { elem, .. } | TypeNode::Slice { elem } => {
                vec![*elem]
            }
            TypeNode::Map { key, value } => vec![*key, *value],
            TypeNode::Struct { fields } => fields.iter().map(|f| f.ty).collect(),
            TypeNode::Interface { methods, embedded } => methods
                .iter()
                .map(|m| m.signature)
                .chain(embedded.iter().copied())
                .collect(),
            TypeNode::Signature {
                params, results, ..
            } => params.iter().chain(results.iter()).copied().collect(),
        }
    }
}

/// Kind of a top-level declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Type,
    Func,
    Var,
    Const,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Type => "type",
            DeclKind::Func => "func",
            DeclKind::Var => "var",
            DeclKind::Const => "const",
        }
    }
}

/// A package-level declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    /// For `Type` declarations this is the `Named` (or `Alias`) node itself.
    #[serde(rename = "type")]
    pub ty: TypeId,
    /// Constant value, rendered as source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A package as delivered by the snapshot provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDef {
    pub path: String,
    /// Load or type-check errors. A package with errors has no usable declarations.
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

impl PackageDef {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }

    /// Add a declaration; returns `self` for chaining in fixtures.
    pub fn declare(&mut self, name: &str, kind: DeclKind, ty: TypeId) -> &mut Self {
        self.declarations.push(Declaration {
            name: name.to_string(),
            kind,
            ty,
            value: None,
        });
        self
    }

    /// Add a constant declaration with its value.
    pub fn declare_const(&mut self, name: &str, ty: TypeId, value: &str) -> &mut Self {
        self.declarations.push(Declaration {
            name: name.to_string(),
            kind: DeclKind::Const,
            ty,
            value: Some(value.to_string()),
        });
        self
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// All packages of a library at one revision plus the shared type arena.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub module_path: String,
    /// Producer-level soft warnings, e.g. an untidy dependency manifest.
    #[serde(default)]
    pub diagnostics: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeNode>,
    #[serde(default)]
    pub packages: Vec<PackageDef>,
}

impl Snapshot {
    pub fn new(module_path: &str) -> Self {
        Self {
            module_path: module_path.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn node(&self, id: TypeId) -> Option<&TypeNode> {
        self.types.get(id as usize)
    }

    /// Append a node to the arena and return its id.
    pub fn add_type(&mut self, node: TypeNode) -> TypeId {
        self.types.push(node);
        (self.types.len() - 1) as TypeId
    }

    /// Append a basic type node.
    pub fn basic(&mut self, name: &str) -> TypeId {
        self.add_type(TypeNode::Basic {
            name: name.to_string(),
        })
    }

    /// Reserve a named type whose underlying type is filled in later with
    /// [`Snapshot::set_underlying`]. This is how self-referential types are built.
    pub fn named(&mut self, qualified_name: &str) -> TypeId {
        self.add_type(TypeNode::Named {
            name: qualified_name.to_string(),
            underlying: None,
            methods: Vec::new(),
        })
    }

    pub fn set_underlying(&mut self, named: TypeId, target: TypeId) {
        if let Some(TypeNode::Named { underlying, .. }) = self.types.get_mut(named as usize) {
            *underlying = Some(target);
        }
    }

    pub fn add_method(&mut self, named: TypeId, method: MethodDef) {
        if let Some(TypeNode::Named { methods, .. }) = self.types.get_mut(named as usize) {
            methods.push(method);
        }
    }

    /// Get the package with the given path, creating it if missing.
    pub fn package_mut(&mut self, path: &str) -> &mut PackageDef {
        if let Some(i) = self.packages.iter().position(|p| p.path == path) {
            return &mut self.packages[i];
        }
        self.packages.push(PackageDef::new(path));
        let last = self.packages.len() - 1;
        &mut self.packages[last]
    }

    /// Check that every type reference points into the arena.
    ///
    /// A dangling reference means the producer emitted a broken document; it
    /// is fatal for the whole run rather than a per-package load error.
    pub fn validate(&self) -> Result<()> {
        let len = self.types.len();
        let check = |id: TypeId| {
            if (id as usize) < len {
                Ok(())
            } else {
                Err(ApirelError::DanglingType { id, len })
            }
        };
        for node in &self.types {
            for child in node.children() {
                check(child)?;
            }
        }
        for decl in self.packages.iter().flat_map(|p| p.declarations.iter()) {
            check(decl.ty)?;
        }
        Ok(())
    }

    /// Sort packages by path, the order every consumer relies on.
    pub fn sort_packages(&mut self) {
        self.packages.sort_by(|a, b| a.path.cmp(&b.path));
    }
}
