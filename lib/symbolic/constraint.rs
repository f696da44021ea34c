//! Constraint domains.
//!
//! Each domain is a closed enum of mutually exclusive members with a total
//! `opposite`. A `Constraint` is a member of any domain, and a
//! `ConstraintSet` holds at most one member per domain.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named family of mutually exclusive facts.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ConstraintDomain {
    Nullability,
    Bool,
    Disposal,
    ByteArray,
    SaltSize,
}

impl ConstraintDomain {
    pub const ALL: [ConstraintDomain; 5] = [
        ConstraintDomain::Nullability,
        ConstraintDomain::Bool,
        ConstraintDomain::Disposal,
        ConstraintDomain::ByteArray,
        ConstraintDomain::SaltSize,
    ];

    fn index(&self) -> usize {
        match *self {
            ConstraintDomain::Nullability => 0,
            ConstraintDomain::Bool => 1,
            ConstraintDomain::Disposal => 2,
            ConstraintDomain::ByteArray => 3,
            ConstraintDomain::SaltSize => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            ConstraintDomain::Nullability => "Nullability",
            ConstraintDomain::Bool => "Bool",
            ConstraintDomain::Disposal => "Disposal",
            ConstraintDomain::ByteArray => "ByteArray",
            ConstraintDomain::SaltSize => "SaltSize",
        }
    }
}

impl fmt::Display for ConstraintDomain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Nullability {
    Null,
    NotNull,
}

impl Nullability {
    pub fn opposite(&self) -> Nullability {
        match *self {
            Nullability::Null => Nullability::NotNull,
            Nullability::NotNull => Nullability::Null,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum BoolConstraint {
    True,
    False,
}

impl BoolConstraint {
    pub fn opposite(&self) -> BoolConstraint {
        match *self {
            BoolConstraint::True => BoolConstraint::False,
            BoolConstraint::False => BoolConstraint::True,
        }
    }
}

impl From<bool> for BoolConstraint {
    fn from(value: bool) -> BoolConstraint {
        if value {
            BoolConstraint::True
        } else {
            BoolConstraint::False
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Disposal {
    Disposed,
    NotDisposed,
}

impl Disposal {
    pub fn opposite(&self) -> Disposal {
        match *self {
            Disposal::Disposed => Disposal::NotDisposed,
            Disposal::NotDisposed => Disposal::Disposed,
        }
    }
}

/// Whether the contents of a byte array are still those it was created with.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum ByteArray {
    Constant,
    Modified,
}

impl ByteArray {
    pub fn opposite(&self) -> ByteArray {
        match *self {
            ByteArray::Constant => ByteArray::Modified,
            ByteArray::Modified => ByteArray::Constant,
        }
    }
}

/// Whether a byte array is long enough to be used as a salt.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum SaltSize {
    Short,
    Safe,
}

impl SaltSize {
    pub fn opposite(&self) -> SaltSize {
        match *self {
            SaltSize::Short => SaltSize::Safe,
            SaltSize::Safe => SaltSize::Short,
        }
    }
}

/// A member of one constraint domain.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Constraint {
    Nullability(Nullability),
    Bool(BoolConstraint),
    Disposal(Disposal),
    ByteArray(ByteArray),
    SaltSize(SaltSize),
}

impl Constraint {
    pub fn domain(&self) -> ConstraintDomain {
        match *self {
            Constraint::Nullability(_) => ConstraintDomain::Nullability,
            Constraint::Bool(_) => ConstraintDomain::Bool,
            Constraint::Disposal(_) => ConstraintDomain::Disposal,
            Constraint::ByteArray(_) => ConstraintDomain::ByteArray,
            Constraint::SaltSize(_) => ConstraintDomain::SaltSize,
        }
    }

    /// The member of the same domain this member negates to.
    pub fn opposite(&self) -> Constraint {
        match *self {
            Constraint::Nullability(n) => Constraint::Nullability(n.opposite()),
            Constraint::Bool(b) => Constraint::Bool(b.opposite()),
            Constraint::Disposal(d) => Constraint::Disposal(d.opposite()),
            Constraint::ByteArray(b) => Constraint::ByteArray(b.opposite()),
            Constraint::SaltSize(s) => Constraint::SaltSize(s.opposite()),
        }
    }

    pub fn nullability(&self) -> Option<Nullability> {
        match *self {
            Constraint::Nullability(n) => Some(n),
            _ => None,
        }
    }

    pub fn bool(&self) -> Option<BoolConstraint> {
        match *self {
            Constraint::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Nullability> for Constraint {
    fn from(n: Nullability) -> Constraint {
        Constraint::Nullability(n)
    }
}

impl From<BoolConstraint> for Constraint {
    fn from(b: BoolConstraint) -> Constraint {
        Constraint::Bool(b)
    }
}

impl From<Disposal> for Constraint {
    fn from(d: Disposal) -> Constraint {
        Constraint::Disposal(d)
    }
}

impl From<ByteArray> for Constraint {
    fn from(b: ByteArray) -> Constraint {
        Constraint::ByteArray(b)
    }
}

impl From<SaltSize> for Constraint {
    fn from(s: SaltSize) -> Constraint {
        Constraint::SaltSize(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Constraint::Nullability(n) => write!(f, "{:?}", n),
            Constraint::Bool(b) => write!(f, "{:?}", b),
            Constraint::Disposal(d) => write!(f, "{:?}", d),
            Constraint::ByteArray(b) => write!(f, "{:?}", b),
            Constraint::SaltSize(s) => write!(f, "{:?}", s),
        }
    }
}

/// The constraints held by one value, at most one per domain.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ConstraintSet {
    members: [Option<Constraint>; 5],
}

impl ConstraintSet {
    pub fn new() -> ConstraintSet {
        ConstraintSet::default()
    }

    pub fn get(&self, domain: ConstraintDomain) -> Option<Constraint> {
        self.members[domain.index()]
    }

    /// A copy of this set with `constraint` replacing any member of its domain.
    pub fn with(mut self, constraint: Constraint) -> ConstraintSet {
        self.members[constraint.domain().index()] = Some(constraint);
        self
    }

    pub fn without(mut self, domain: ConstraintDomain) -> ConstraintSet {
        self.members[domain.index()] = None;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.members.iter().all(|member| member.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.members.iter().filter_map(|member| *member)
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let members = self
            .iter()
            .map(|constraint| constraint.to_string())
            .collect::<Vec<String>>();
        write!(f, "{{{}}}", members.join(", "))
    }
}
