//! The semantic query surface the engine consults while exploring.
//!
//! The engine never resolves names itself. Every instruction carries the
//! `NodeId` of the syntax node it was built from, and a `SemanticModel`
//! answers what that node refers to. A query answering `None` is never an
//! error: the engine treats the node as an unknown value.

use crate::il::NodeId;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of storage a `Symbol` names.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field,
}

/// A program symbol whose value the engine tracks.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Symbol {
    name: String,
    kind: SymbolKind,
}

impl Symbol {
    pub fn new<S: Into<String>>(name: S, kind: SymbolKind) -> Symbol {
        Symbol {
            name: name.into(),
            kind,
        }
    }

    pub fn local<S: Into<String>>(name: S) -> Symbol {
        Symbol::new(name, SymbolKind::Local)
    }

    pub fn parameter<S: Into<String>>(name: S) -> Symbol {
        Symbol::new(name, SymbolKind::Parameter)
    }

    pub fn field<S: Into<String>>(name: S) -> Symbol {
        Symbol::new(name, SymbolKind::Field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A resolved method: the type declaring it and its name.
///
/// Constructors are named `.ctor`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct MethodRef {
    containing_type: String,
    name: String,
}

impl MethodRef {
    pub fn new<S: Into<String>, T: Into<String>>(containing_type: S, name: T) -> MethodRef {
        MethodRef {
            containing_type: containing_type.into(),
            name: name.into(),
        }
    }

    pub fn constructor<S: Into<String>>(containing_type: S) -> MethodRef {
        MethodRef::new(containing_type, ".ctor")
    }

    pub fn containing_type(&self) -> &str {
        &self.containing_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_constructor(&self) -> bool {
        self.name == ".ctor"
    }

    /// Returns true if this method is `name` declared on one of `types`.
    pub fn matches(&self, types: &[&str], name: &str) -> bool {
        self.name == name && types.contains(&self.containing_type.as_str())
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.containing_type, self.name)
    }
}

/// A compile-time constant.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Integer(i64),
    String(String),
}

impl Constant {
    pub fn integer(&self) -> Option<i64> {
        match *self {
            Constant::Integer(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Constant::Null => write!(f, "null"),
            Constant::Bool(value) => write!(f, "{}", value),
            Constant::Integer(value) => write!(f, "{}", value),
            Constant::String(ref value) => write!(f, "\"{}\"", value),
        }
    }
}

/// Answers symbol and type queries about syntax nodes.
pub trait SemanticModel: Sync {
    /// The symbol an identifier, assignment target or member access refers to.
    fn symbol(&self, node: NodeId) -> Option<Symbol>;
    /// The declared type of the expression at `node`.
    fn type_of(&self, node: NodeId) -> Option<String>;
    /// The method an invocation or object creation binds to.
    fn method(&self, node: NodeId) -> Option<MethodRef>;
    /// The value of `node` if it is a compile-time constant.
    fn constant_value(&self, node: NodeId) -> Option<Constant>;
}

/// A `SemanticModel` backed by plain tables, filled by a front end or loaded
/// from JSON.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct SemanticTable {
    symbols: BTreeMap<NodeId, Symbol>,
    types: BTreeMap<NodeId, String>,
    methods: BTreeMap<NodeId, MethodRef>,
    constants: BTreeMap<NodeId, Constant>,
}

impl SemanticTable {
    pub fn new() -> SemanticTable {
        SemanticTable::default()
    }

    pub fn from_json(json: &str) -> Result<SemanticTable, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn insert_symbol(&mut self, node: NodeId, symbol: Symbol) {
        self.symbols.insert(node, symbol);
    }

    pub fn insert_type<S: Into<String>>(&mut self, node: NodeId, type_name: S) {
        self.types.insert(node, type_name.into());
    }

    pub fn insert_method(&mut self, node: NodeId, method: MethodRef) {
        self.methods.insert(node, method);
    }

    pub fn insert_constant(&mut self, node: NodeId, constant: Constant) {
        self.constants.insert(node, constant);
    }
}

impl SemanticModel for SemanticTable {
    fn symbol(&self, node: NodeId) -> Option<Symbol> {
        self.symbols.get(&node).cloned()
    }

    fn type_of(&self, node: NodeId) -> Option<String> {
        self.types.get(&node).cloned()
    }

    fn method(&self, node: NodeId) -> Option<MethodRef> {
        self.methods.get(&node).cloned()
    }

    fn constant_value(&self, node: NodeId) -> Option<Constant> {
        self.constants.get(&node).cloned()
    }
}
