//! BSON type lattice
//!
//! Every observed or declared value has a `BsonType`. Types form a lattice
//! with `Any` at the top; heterogeneous observations are represented as
//! `AnyOf`, which is kept flat (an `AnyOf` never contains another `AnyOf`).
//!
//! Two relations matter to the analyzers:
//! - `cardinality`: estimated number of distinct values a field can take
//! - `is_assignable_to`: whether a value of this type may be stored in a
//!   field of the other type. This relation is not symmetric.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Cardinality used for types without a known bound
pub const UNBOUNDED_CARDINALITY: u64 = u64::MAX;

/// A BSON type as inferred from samples or literals
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BsonType {
    String,
    Boolean,
    Date,
    ObjectId,
    Int32,
    Int64,
    Double,
    Decimal128,
    Null,
    Uuid,
    /// Top of the lattice
    Any,
    /// Sub-document with known fields
    Object { fields: BTreeMap<String, BsonType> },
    /// Array of a single (possibly union) element type
    Array { element: Box<BsonType> },
    /// Union of observed types
    AnyOf { types: BTreeSet<BsonType> },
    /// Closed set of string values
    Enum {
        members: BTreeSet<String>,
        name: Option<String>,
    },
}

impl BsonType {
    /// Builds an object type from `(field, type)` pairs
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, BsonType)>,
    {
        BsonType::Object {
            fields: fields.into_iter().map(|(k, t)| (k.into(), t)).collect(),
        }
    }

    /// Object type without any field
    pub fn empty_object() -> Self {
        BsonType::Object {
            fields: BTreeMap::new(),
        }
    }

    /// Builds an array type
    pub fn array(element: BsonType) -> Self {
        BsonType::Array {
            element: Box::new(element),
        }
    }

    /// Builds a normalized union.
    ///
    /// Nested unions are flattened and duplicates removed. A union of a
    /// single type is that type; an empty union is `Any`.
    pub fn any_of<I>(types: I) -> Self
    where
        I: IntoIterator<Item = BsonType>,
    {
        let mut flat = BTreeSet::new();
        for t in types {
            match t.flatten_any_of() {
                BsonType::AnyOf { types } => flat.extend(types),
                other => {
                    flat.insert(other);
                }
            }
        }

        match flat.len() {
            0 => BsonType::Any,
            1 => flat.into_iter().next().unwrap_or(BsonType::Any),
            _ => BsonType::AnyOf { types: flat },
        }
    }

    /// Builds an enumeration of string members
    pub fn enumeration<I, M>(members: I, name: Option<String>) -> Self
    where
        M: Into<String>,
        I: IntoIterator<Item = M>,
    {
        BsonType::Enum {
            members: members.into_iter().map(Into::into).collect(),
            name,
        }
    }

    /// Estimated number of distinct values
    pub fn cardinality(&self) -> u64 {
        match self {
            BsonType::Boolean => 2,
            BsonType::Null => 1,
            BsonType::Enum { members, .. } => members.len() as u64,
            BsonType::AnyOf { types } => types
                .iter()
                .map(BsonType::cardinality)
                .max()
                .unwrap_or(UNBOUNDED_CARDINALITY),
            _ => UNBOUNDED_CARDINALITY,
        }
    }

    /// Whether a value of this type can be stored in a field of type `other`
    pub fn is_assignable_to(&self, other: &BsonType) -> bool {
        if matches!(other, BsonType::Any) {
            return true;
        }

        match self {
            BsonType::Null => match other {
                BsonType::Null => true,
                BsonType::AnyOf { types } => types.contains(&BsonType::Null),
                _ => false,
            },
            BsonType::AnyOf { types } => match other {
                BsonType::Null => types.iter().all(|t| *t == BsonType::Null),
                _ => types
                    .iter()
                    .filter(|t| **t != BsonType::Null)
                    .all(|t| t.is_assignable_to(other)),
            },
            BsonType::Object { fields } => match other {
                BsonType::AnyOf { types } => types.iter().any(|t| self.is_assignable_to(t)),
                BsonType::Object {
                    fields: other_fields,
                } => fields.iter().all(|(name, field_type)| {
                    other_fields
                        .get(name)
                        .is_some_and(|other_type| field_type.is_assignable_to(other_type))
                }),
                _ => false,
            },
            BsonType::Array { element } => match other {
                BsonType::AnyOf { types } => types.iter().any(|t| self.is_assignable_to(t)),
                BsonType::Array {
                    element: other_element,
                } => element.is_assignable_to(other_element),
                _ => element.is_assignable_to(other),
            },
            BsonType::Enum { members, .. } => match other {
                BsonType::Enum {
                    members: other_members,
                    ..
                } => members.is_subset(other_members),
                BsonType::String => true,
                BsonType::AnyOf { types } => types.iter().any(|t| self.is_assignable_to(t)),
                _ => self.is_assignable_by_default(other),
            },
            BsonType::Int32 if *other == BsonType::Int64 => true,
            BsonType::Double if *other == BsonType::Decimal128 => true,
            _ => self.is_assignable_by_default(other),
        }
    }

    fn is_assignable_by_default(&self, other: &BsonType) -> bool {
        if self == other || matches!(self, BsonType::Any) {
            return true;
        }

        match other {
            BsonType::AnyOf { types } => types
                .iter()
                .filter(|t| **t != BsonType::Null)
                .any(|t| self.is_assignable_to(t)),
            BsonType::Array { element } => self.is_assignable_to(element),
            _ => false,
        }
    }

    /// Deep union of two observed types
    pub fn merge(&self, other: &BsonType) -> BsonType {
        match (self, other) {
            (BsonType::Object { fields: left }, BsonType::Object { fields: right }) => {
                let mut merged = left.clone();
                for (name, right_type) in right {
                    let field_type = match merged.get(name) {
                        Some(left_type) => left_type.merge(right_type),
                        None => right_type.clone(),
                    };
                    merged.insert(name.clone(), field_type);
                }
                BsonType::Object { fields: merged }
            }
            (BsonType::Array { element: left }, BsonType::Array { element: right }) => {
                BsonType::array(left.merge(right))
            }
            _ if self == other => self.clone(),
            _ => BsonType::any_of([self.clone(), other.clone()]),
        }
    }

    /// Recursively normalizes unions so no `AnyOf` nests inside another
    pub fn flatten_any_of(&self) -> BsonType {
        match self {
            BsonType::AnyOf { types } => {
                let mut flat = BTreeSet::new();
                for t in types {
                    match t.flatten_any_of() {
                        BsonType::AnyOf { types } => flat.extend(types),
                        other => {
                            flat.insert(other);
                        }
                    }
                }
                if flat.len() == 1 {
                    flat.into_iter().next().unwrap_or(BsonType::Any)
                } else {
                    BsonType::AnyOf { types: flat }
                }
            }
            BsonType::Object { fields } => BsonType::Object {
                fields: fields
                    .iter()
                    .map(|(k, t)| (k.clone(), t.flatten_any_of()))
                    .collect(),
            },
            BsonType::Array { element } => BsonType::array(element.flatten_any_of()),
            other => other.clone(),
        }
    }

    /// Whether `null` is among the observed values
    pub fn is_nullable(&self) -> bool {
        match self {
            BsonType::Null | BsonType::Any => true,
            BsonType::AnyOf { types } => types.contains(&BsonType::Null),
            _ => false,
        }
    }

    /// The type without its `null` alternative
    pub fn to_non_nullable(&self) -> BsonType {
        match self {
            BsonType::Null => BsonType::Any,
            BsonType::AnyOf { types } => types
                .iter()
                .find(|t| **t != BsonType::Null)
                .cloned()
                .unwrap_or(BsonType::Any),
            other => other.clone(),
        }
    }
}

impl fmt::Display for BsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsonType::String => write!(f, "String"),
            BsonType::Boolean => write!(f, "Boolean"),
            BsonType::Date => write!(f, "Date"),
            BsonType::ObjectId => write!(f, "ObjectId"),
            BsonType::Int32 => write!(f, "Int32"),
            BsonType::Int64 => write!(f, "Int64"),
            BsonType::Double => write!(f, "Double"),
            BsonType::Decimal128 => write!(f, "Decimal128"),
            BsonType::Null => write!(f, "Null"),
            BsonType::Uuid => write!(f, "UUID"),
            BsonType::Any => write!(f, "Any"),
            BsonType::Object { .. } => write!(f, "Object"),
            BsonType::Array { element } => write!(f, "Array<{}>", element),
            BsonType::AnyOf { types } => {
                let names: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join(" | "))
            }
            BsonType::Enum { name: Some(name), .. } => write!(f, "{}", name),
            BsonType::Enum { members, .. } => {
                let names: Vec<&str> = members.iter().map(String::as_str).collect();
                write!(f, "Enum({})", names.join(", "))
            }
        }
    }
}
