//! Collection schema inferred from sampled documents

use std::collections::BTreeMap;

use serde_json::{json, Value};

use super::bson_type::BsonType;
use super::distribution::DataDistribution;
use super::ejson::bson_type_of;
use super::namespace::Namespace;

/// Inferred shape and value distribution of a collection
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSchema {
    pub namespace: Namespace,
    pub schema: BsonType,
    pub data_distribution: DataDistribution,
}

impl CollectionSchema {
    /// Schema with no observed fields
    pub fn empty(namespace: Namespace) -> Self {
        Self {
            namespace,
            schema: BsonType::empty_object(),
            data_distribution: DataDistribution::default(),
        }
    }

    /// Infers a schema by merging the shape of every sample
    pub fn from_samples(namespace: Namespace, samples: &[Value]) -> Self {
        let schema = samples
            .iter()
            .map(bson_type_of)
            .filter(|t| matches!(t, BsonType::Object { .. }))
            .reduce(|acc, t| acc.merge(&t))
            .map(|t| t.flatten_any_of())
            .unwrap_or_else(BsonType::empty_object);

        Self {
            namespace,
            schema,
            data_distribution: DataDistribution::generate(samples),
        }
    }

    /// Type at a dotted field path. Paths never observed are `Null`.
    pub fn type_of(&self, path: &str) -> BsonType {
        let segments: Vec<&str> = path.split('.').collect();
        type_at(&self.schema, &segments)
    }

    /// Every field as `(dotted path, type)`, parents before children
    pub fn all_field_names_qualified(&self) -> Vec<(String, BsonType)> {
        let mut fields = Vec::new();
        collect_fields(&self.schema, "", &mut fields);
        fields
    }

    pub fn is_empty(&self) -> bool {
        match &self.schema {
            BsonType::Object { fields } => fields.is_empty(),
            _ => true,
        }
    }

    /// JSON rendering for the command line
    pub fn to_json(&self) -> Value {
        let fields: BTreeMap<String, String> = self
            .all_field_names_qualified()
            .into_iter()
            .map(|(path, t)| (path, t.to_string()))
            .collect();

        json!({
            "namespace": self.namespace.to_string(),
            "schema": self.schema,
            "fields": fields,
            "distribution": self.data_distribution.to_json(),
        })
    }
}

fn type_at(current: &BsonType, segments: &[&str]) -> BsonType {
    let Some((head, rest)) = segments.split_first() else {
        return current.clone();
    };

    match current {
        BsonType::Object { fields } => match fields.get(*head) {
            Some(field_type) => type_at(field_type, rest),
            None => BsonType::Null,
        },
        BsonType::Array { element } => {
            if head.parse::<usize>().is_ok() {
                type_at(element, rest)
            } else {
                type_at(element, segments)
            }
        }
        BsonType::AnyOf { types } => {
            BsonType::any_of(types.iter().map(|t| type_at(t, segments)))
        }
        BsonType::Any => BsonType::Any,
        _ => BsonType::Null,
    }
}

fn collect_fields(current: &BsonType, prefix: &str, out: &mut Vec<(String, BsonType)>) {
    match current {
        BsonType::Object { fields } => {
            for (name, field_type) in fields {
                let path = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", prefix, name)
                };
                out.push((path.clone(), field_type.clone()));
                collect_fields(field_type, &path, out);
            }
        }
        BsonType::Array { element } => collect_fields(element, prefix, out),
        BsonType::AnyOf { types } => {
            for t in types {
                collect_fields(t, prefix, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn namespace() -> Namespace {
        Namespace::new("myDb", "myCollection")
    }

    #[test]
    fn test_type_of_top_level_field() {
        let schema = CollectionSchema::from_samples(
            namespace(),
            &[json!({"myString": "hello", "myInt": 42})],
        );

        assert_eq!(schema.type_of("myString"), BsonType::String);
        assert_eq!(schema.type_of("myInt"), BsonType::Int32);
        assert_eq!(schema.type_of("myBoolean"), BsonType::Null);
    }

    #[test]
    fn test_type_of_through_array_index() {
        let schema = CollectionSchema {
            namespace: namespace(),
            schema: BsonType::object([(
                "myField",
                BsonType::array(BsonType::any_of([
                    BsonType::String,
                    BsonType::object([("otherField", BsonType::Double)]),
                ])),
            )]),
            data_distribution: DataDistribution::default(),
        };

        assert_eq!(
            schema.type_of("myField.0.otherField"),
            BsonType::any_of([BsonType::Null, BsonType::Double])
        );
        assert_eq!(
            schema.type_of("myField.otherField"),
            BsonType::any_of([BsonType::Null, BsonType::Double])
        );
    }

    #[test]
    fn test_missing_field_in_some_samples_merges() {
        let schema = CollectionSchema::from_samples(
            namespace(),
            &[
                json!({"a": 1, "nested": {"b": "x"}}),
                json!({"a": "one", "nested": {"c": true}}),
            ],
        );

        assert_eq!(
            schema.type_of("a"),
            BsonType::any_of([BsonType::Int32, BsonType::String])
        );
        assert_eq!(schema.type_of("nested.b"), BsonType::String);
        assert_eq!(schema.type_of("nested.c"), BsonType::Boolean);
    }

    #[test]
    fn test_all_field_names_qualified() {
        let schema = CollectionSchema::from_samples(
            namespace(),
            &[json!({"a": {"b": 1}, "c": [{"d": true}]})],
        );

        let paths: Vec<String> = schema
            .all_field_names_qualified()
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["a", "a.b", "c", "c.d"]);
    }

    #[test]
    fn test_empty_schema() {
        let schema = CollectionSchema::empty(namespace());
        assert!(schema.is_empty());
        assert_eq!(schema.type_of("anything"), BsonType::Null);
    }
}
