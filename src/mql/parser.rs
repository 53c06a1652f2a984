//! Query reader for MongoDB JSON syntax
//!
//! Builds query trees from filter, sort and pipeline documents written as
//! (Extended) JSON. Every field is treated as schema-rooted and every
//! literal as a constant; the resulting nodes carry no source handle.

use serde_json::{Map, Value};

use super::components::{
    CommandType, Component, HasAggregation, HasCollectionReference, HasFieldReference,
    HasFilter, HasProjections, HasSorts, HasValueReference, IsCommand, Name, Named,
};
use super::ejson::is_extended_scalar;
use super::errors::{MqlError, MqlResult};
use super::namespace::Namespace;
use super::node::Node;

/// Parses a filter document into its top-level predicates.
///
/// A top-level `$and` is flattened into the returned list.
pub fn parse_filter(filter: &Value) -> MqlResult<Vec<Node<()>>> {
    let document = as_document(filter, "filter")?;
    let mut predicates = Vec::new();

    for (key, value) in document {
        match key.as_str() {
            "$and" => {
                for clause in as_array(value, "$and")? {
                    predicates.extend(parse_filter(clause)?);
                }
            }
            _ => predicates.push(parse_entry(key, value)?),
        }
    }

    Ok(predicates)
}

/// Parses a sort document; `-1` sorts descending, anything else ascending
pub fn parse_sort(sort: &Value) -> MqlResult<Vec<Node<()>>> {
    let document = as_document(sort, "sort")?;

    Ok(document
        .iter()
        .map(|(field, direction)| {
            let name = if direction.as_i64() == Some(-1) {
                Name::Descending
            } else {
                Name::Ascending
            };
            field_node(name, field, direction.clone())
        })
        .collect())
}

/// Parses an aggregation pipeline
pub fn parse_pipeline(pipeline: &Value) -> MqlResult<Vec<Node<()>>> {
    as_array(pipeline, "pipeline")?
        .iter()
        .map(parse_stage)
        .collect()
}

/// Builds a complete query against `namespace`.
///
/// With a pipeline the command is `aggregate`, otherwise `find`.
pub fn parse_query(
    namespace: &Namespace,
    filter: Option<&Value>,
    sort: Option<&Value>,
    pipeline: Option<&Value>,
) -> MqlResult<Node<()>> {
    let mut components: Vec<Component<()>> = vec![HasCollectionReference::Known {
        database_source: Some(()),
        collection_source: (),
        namespace: namespace.clone(),
        schema: None,
    }
    .into()];

    match pipeline {
        Some(pipeline) => {
            components.push(IsCommand(CommandType::Aggregate).into());
            components.push(HasAggregation::new(parse_pipeline(pipeline)?).into());
        }
        None => components.push(IsCommand(CommandType::Find).into()),
    }

    if let Some(filter) = filter {
        components.push(HasFilter::new(parse_filter(filter)?).into());
    }

    if let Some(sort) = sort {
        components.push(HasSorts::new(parse_sort(sort)?).into());
    }

    Ok(Node::new((), components))
}

fn parse_entry(key: &str, value: &Value) -> MqlResult<Node<()>> {
    match key {
        "$or" | "$nor" => {
            let name = Name::from_canonical(key);
            let mut children = Vec::new();
            for clause in as_array(value, key)? {
                children.push(group(parse_filter(clause)?));
            }
            Ok(logical_node(name, children))
        }
        _ if key.starts_with('$') => Ok(Node::new(
            (),
            vec![
                Named(Name::from_canonical(key)).into(),
                HasValueReference::constant((), value.clone()).into(),
            ],
        )),
        field => match operator_document(value) {
            Some(operators) => {
                let mut nodes = Vec::with_capacity(operators.len());
                for (operator, argument) in operators {
                    nodes.push(parse_operator(field, operator, argument)?);
                }
                Ok(group(nodes))
            }
            None => Ok(field_node(Name::Eq, field, value.clone())),
        },
    }
}

fn parse_operator(field: &str, operator: &str, argument: &Value) -> MqlResult<Node<()>> {
    match operator {
        "$not" => {
            let inner = match operator_document(argument) {
                Some(operators) => {
                    let mut nodes = Vec::with_capacity(operators.len());
                    for (operator, argument) in operators {
                        nodes.push(parse_operator(field, operator, argument)?);
                    }
                    nodes
                }
                None => vec![field_node(Name::Regex, field, argument.clone())],
            };
            Ok(Node::new(
                (),
                vec![
                    Named(Name::Not).into(),
                    HasFieldReference::from_schema((), field).into(),
                    HasFilter::new(inner).into(),
                ],
            ))
        }
        _ => Ok(field_node(
            Name::from_canonical(operator),
            field,
            argument.clone(),
        )),
    }
}

fn parse_stage(stage: &Value) -> MqlResult<Node<()>> {
    let document = as_document(stage, "stage")?;
    let (operator, body) = match document.iter().next() {
        Some(entry) if document.len() == 1 => entry,
        _ => {
            return Err(MqlError::InvalidFilter(
                "pipeline stage must have exactly one operator".into(),
            ))
        }
    };

    let name = Name::from_canonical(operator);
    let mut components: Vec<Component<()>> = vec![Named(name).into()];

    match name {
        Name::Match => components.push(HasFilter::new(parse_filter(body)?).into()),
        Name::Sort => components.push(HasSorts::new(parse_sort(body)?).into()),
        Name::Project => components.push(HasProjections::new(parse_projection(body)?).into()),
        _ => components.push(HasValueReference::constant((), body.clone()).into()),
    }

    Ok(Node::new((), components))
}

fn parse_projection(projection: &Value) -> MqlResult<Vec<Node<()>>> {
    let document = as_document(projection, "$project")?;

    Ok(document
        .iter()
        .map(|(field, value)| {
            let excluded = matches!(value, Value::Bool(false))
                || value.as_f64() == Some(0.0);
            let name = if excluded { Name::Exclude } else { Name::Include };
            field_node(name, field, value.clone())
        })
        .collect())
}

fn field_node(name: Name, field: &str, value: Value) -> Node<()> {
    Node::new(
        (),
        vec![
            Named(name).into(),
            HasFieldReference::from_schema((), field).into(),
            HasValueReference::constant((), value).into(),
        ],
    )
}

fn logical_node(name: Name, children: Vec<Node<()>>) -> Node<()> {
    Node::new(
        (),
        vec![Named(name).into(), HasFilter::new(children).into()],
    )
}

/// One node stays as is, several are wrapped in an `and`
fn group(mut nodes: Vec<Node<()>>) -> Node<()> {
    if nodes.len() == 1 {
        if let Some(node) = nodes.pop() {
            return node;
        }
    }
    logical_node(Name::And, nodes)
}

/// Operator document such as `{"$gt": 5, "$lt": 10}`
fn operator_document(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Object(map)
            if !map.is_empty()
                && !is_extended_scalar(value)
                && map.keys().all(|k| k.starts_with('$')) =>
        {
            Some(map)
        }
        _ => None,
    }
}

fn as_document<'a>(value: &'a Value, what: &str) -> MqlResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| MqlError::InvalidFilter(format!("{} must be a document", what)))
}

fn as_array<'a>(value: &'a Value, what: &str) -> MqlResult<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| MqlError::InvalidFilter(format!("{} must be an array", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mql::bson_type::BsonType;
    use crate::mql::extract::{field_predicate, filters, operation, pipeline};
    use serde_json::json;

    #[test]
    fn test_implicit_equality() {
        let nodes = parse_filter(&json!({"name": "Ada", "age": 36})).unwrap();
        assert_eq!(nodes.len(), 2);

        let fact = field_predicate(&nodes[0]).unwrap();
        assert_eq!(fact.operation, Some(Name::Eq));
        assert!(["name", "age"].contains(&fact.field_name));
    }

    #[test]
    fn test_operator_document() {
        let nodes = parse_filter(&json!({"age": {"$gt": 18}})).unwrap();
        let fact = field_predicate(&nodes[0]).unwrap();

        assert_eq!(fact.field_name, "age");
        assert_eq!(fact.operation, Some(Name::Gt));
    }

    #[test]
    fn test_multiple_operators_are_grouped() {
        let nodes = parse_filter(&json!({"age": {"$gt": 18, "$lt": 65}})).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(operation(&nodes[0]), Some(Name::And));
        assert_eq!(filters(&nodes[0]).len(), 2);
    }

    #[test]
    fn test_top_level_and_is_flattened() {
        let nodes = parse_filter(&json!({"$and": [{"a": 1}, {"b": 2}]})).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_or_children() {
        let nodes = parse_filter(&json!({"$or": [{"a": 1}, {"b": 2, "c": 3}]})).unwrap();
        assert_eq!(operation(&nodes[0]), Some(Name::Or));

        let children = filters(&nodes[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(operation(&children[1]), Some(Name::And));
    }

    #[test]
    fn test_in_value_is_array() {
        let nodes = parse_filter(&json!({"status": {"$in": ["A", "B"]}})).unwrap();
        let fact = field_predicate(&nodes[0]).unwrap();
        assert_eq!(
            fact.value.unwrap().bson_type(),
            &BsonType::array(BsonType::String)
        );
    }

    #[test]
    fn test_extended_json_literal_is_not_operator() {
        let nodes = parse_filter(&json!({"_id": {"$oid": "5f1d7f3e9d1b2c3a4b5c6d7e"}})).unwrap();
        let fact = field_predicate(&nodes[0]).unwrap();
        assert_eq!(fact.operation, Some(Name::Eq));
        assert_eq!(fact.value.unwrap().bson_type(), &BsonType::ObjectId);
    }

    #[test]
    fn test_sort_directions() {
        let nodes = parse_sort(&json!({"a": 1, "b": -1})).unwrap();
        assert_eq!(operation(&nodes[0]), Some(Name::Ascending));
        assert_eq!(operation(&nodes[1]), Some(Name::Descending));
    }

    #[test]
    fn test_pipeline_query() {
        let namespace = Namespace::new("db", "coll");
        let query = parse_query(
            &namespace,
            None,
            None,
            Some(&json!([{"$match": {"a": 1}}, {"$project": {"a": 1, "b": 0}}])),
        )
        .unwrap();

        let stages = pipeline(&query);
        assert_eq!(stages.len(), 2);
        assert_eq!(operation(&stages[0]), Some(Name::Match));
        assert_eq!(filters(&stages[0]).len(), 1);
    }

    #[test]
    fn test_rejects_non_document() {
        assert!(parse_filter(&json!([1, 2])).is_err());
        assert!(parse_pipeline(&json!([{"$match": {}, "$sort": {}}])).is_err());
    }
}
