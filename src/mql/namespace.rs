//! Database namespace (`database.collection`)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::MqlError;

/// A database and collection pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    /// Creates a namespace
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }

    /// Both database and collection are non-blank
    pub fn is_valid(&self) -> bool {
        !self.database.trim().is_empty() && !self.collection.trim().is_empty()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

impl FromStr for Namespace {
    type Err = MqlError;

    /// Splits on the first dot; collection names may contain dots.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((database, collection)) if !database.is_empty() && !collection.is_empty() => {
                Ok(Namespace::new(database, collection))
            }
            _ => Err(MqlError::InvalidNamespace(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Namespace::new("db", "coll").to_string(), "db.coll");
    }

    #[test]
    fn test_blank_is_invalid() {
        assert!(!Namespace::new("", "coll").is_valid());
        assert!(!Namespace::new("db", "  ").is_valid());
        assert!(Namespace::new("db", "coll").is_valid());
    }

    #[test]
    fn test_parse_splits_on_first_dot() {
        let ns: Namespace = "db.system.views".parse().unwrap();
        assert_eq!(ns.database, "db");
        assert_eq!(ns.collection, "system.views");
    }

    #[test]
    fn test_parse_rejects_missing_collection() {
        assert!("db".parse::<Namespace>().is_err());
        assert!("db.".parse::<Namespace>().is_err());
    }
}
