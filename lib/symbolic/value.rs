//! Symbolic values.
//!
//! A `SymbolicValue` is an opaque identity. Two values are equal only when
//! they came from the same construction step, no matter what they were
//! derived from. Values are reference counted and shared by every state that
//! mentions them.

use crate::il::Symbol;
use crate::symbolic::{BoolConstraint, Constraint, ConstraintDomain, Nullability};
use crate::RC;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

const UNKNOWN_ID: u32 = 0;
const NULL_ID: u32 = 1;
const THIS_ID: u32 = 2;
const TRUE_ID: u32 = 3;
const FALSE_ID: u32 = 4;
const FIRST_FRESH_ID: u32 = 5;

/// How a `SymbolicValue` was constructed.
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// Stands in for values the engine could not model.
    Unknown,
    Null,
    This,
    True,
    False,
    /// A value with no known relation to any other.
    Fresh,
    /// The canonical value a symbol is rebound to when a loop is widened.
    Widened { header: usize, symbol: Symbol },
    Equal(SymbolicValue, SymbolicValue),
    NotEqual(SymbolicValue, SymbolicValue),
    Not(SymbolicValue),
}

#[derive(Clone)]
pub struct SymbolicValue {
    id: u32,
    kind: RC<ValueKind>,
}

impl SymbolicValue {
    fn new(id: u32, kind: ValueKind) -> SymbolicValue {
        SymbolicValue {
            id,
            kind: RC::new(kind),
        }
    }

    /// The sentinel returned when popping an empty stack.
    pub fn unknown() -> SymbolicValue {
        SymbolicValue::new(UNKNOWN_ID, ValueKind::Unknown)
    }

    pub fn null() -> SymbolicValue {
        SymbolicValue::new(NULL_ID, ValueKind::Null)
    }

    pub fn this() -> SymbolicValue {
        SymbolicValue::new(THIS_ID, ValueKind::This)
    }

    pub fn true_() -> SymbolicValue {
        SymbolicValue::new(TRUE_ID, ValueKind::True)
    }

    pub fn false_() -> SymbolicValue {
        SymbolicValue::new(FALSE_ID, ValueKind::False)
    }

    pub fn from_bool(value: bool) -> SymbolicValue {
        if value {
            SymbolicValue::true_()
        } else {
            SymbolicValue::false_()
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    pub fn is_unknown(&self) -> bool {
        self.id == UNKNOWN_ID
    }

    pub fn is_null(&self) -> bool {
        self.id == NULL_ID
    }

    pub fn is_this(&self) -> bool {
        self.id == THIS_ID
    }

    /// The values this value was derived from.
    pub fn operands(&self) -> Vec<&SymbolicValue> {
        match *self.kind {
            ValueKind::Equal(ref left, ref right) | ValueKind::NotEqual(ref left, ref right) => {
                vec![left, right]
            }
            ValueKind::Not(ref operand) => vec![operand],
            _ => Vec::new(),
        }
    }

    /// Constraints singleton values hold without being stored in any state.
    pub fn intrinsic_constraint(&self, domain: ConstraintDomain) -> Option<Constraint> {
        match (&*self.kind, domain) {
            (ValueKind::Null, ConstraintDomain::Nullability) => Some(Nullability::Null.into()),
            (ValueKind::This, ConstraintDomain::Nullability)
            | (ValueKind::True, ConstraintDomain::Nullability)
            | (ValueKind::False, ConstraintDomain::Nullability) => {
                Some(Nullability::NotNull.into())
            }
            (ValueKind::True, ConstraintDomain::Bool) => Some(BoolConstraint::True.into()),
            (ValueKind::False, ConstraintDomain::Bool) => Some(BoolConstraint::False.into()),
            _ => None,
        }
    }
}

impl PartialEq for SymbolicValue {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SymbolicValue {}

impl Hash for SymbolicValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialOrd for SymbolicValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolicValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SymbolicValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.kind {
            ValueKind::Unknown => write!(f, "unknown"),
            ValueKind::Null => write!(f, "null"),
            ValueKind::This => write!(f, "this"),
            ValueKind::True => write!(f, "true"),
            ValueKind::False => write!(f, "false"),
            ValueKind::Fresh => write!(f, "sv_{}", self.id),
            ValueKind::Widened { header, ref symbol } => {
                write!(f, "sv_{}({}@0x{:X})", self.id, symbol, header)
            }
            ValueKind::Equal(ref left, ref right) => {
                write!(f, "sv_{}({} == {})", self.id, left, right)
            }
            ValueKind::NotEqual(ref left, ref right) => {
                write!(f, "sv_{}({} != {})", self.id, left, right)
            }
            ValueKind::Not(ref operand) => write!(f, "sv_{}(!{})", self.id, operand),
        }
    }
}

/// Creates the symbolic values of one exploration run.
///
/// Identities are handed out in creation order, so exploring the same
/// procedure twice creates the same values.
#[derive(Debug)]
pub struct ValueFactory {
    next_id: u32,
    widened: FxHashMap<(usize, Symbol), SymbolicValue>,
}

impl Default for ValueFactory {
    fn default() -> Self {
        ValueFactory::new()
    }
}

impl ValueFactory {
    pub fn new() -> ValueFactory {
        ValueFactory {
            next_id: FIRST_FRESH_ID,
            widened: FxHashMap::default(),
        }
    }

    fn next(&mut self, kind: ValueKind) -> SymbolicValue {
        let id = self.next_id;
        self.next_id += 1;
        SymbolicValue::new(id, kind)
    }

    pub fn fresh(&mut self) -> SymbolicValue {
        self.next(ValueKind::Fresh)
    }

    /// The value of `left == right`.
    pub fn equal(&mut self, left: SymbolicValue, right: SymbolicValue) -> SymbolicValue {
        if left == right {
            return SymbolicValue::true_();
        }
        self.next(ValueKind::Equal(left, right))
    }

    /// The value of `left != right`.
    pub fn not_equal(&mut self, left: SymbolicValue, right: SymbolicValue) -> SymbolicValue {
        if left == right {
            return SymbolicValue::false_();
        }
        self.next(ValueKind::NotEqual(left, right))
    }

    /// The value of `!operand`.
    pub fn not(&mut self, operand: SymbolicValue) -> SymbolicValue {
        match *operand.kind() {
            ValueKind::True => SymbolicValue::false_(),
            ValueKind::False => SymbolicValue::true_(),
            _ => self.next(ValueKind::Not(operand)),
        }
    }

    /// The canonical value of `symbol` at the widened loop headed by `header`.
    ///
    /// Repeated calls return the same value.
    pub fn widened(&mut self, header: usize, symbol: &Symbol) -> SymbolicValue {
        let key = (header, symbol.clone());
        if let Some(value) = self.widened.get(&key) {
            return value.clone();
        }
        let value = self.next(ValueKind::Widened {
            header,
            symbol: symbol.clone(),
        });
        self.widened.insert(key, value.clone());
        value
    }

    /// How many values this factory created.
    pub fn created(&self) -> u32 {
        self.next_id - FIRST_FRESH_ID
    }
}
