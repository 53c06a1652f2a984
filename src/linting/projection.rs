//! `$project` stages mixing inclusions and exclusions
//!
//! MongoDB rejects such a projection; `_id` is the only field that may be
//! excluded from an inclusion projection and vice versa.

use crate::mql::extract::{has_name, operation, pipeline, schema_field_name};
use crate::mql::{HasFieldReference, HasProjections, Name, Node};

use super::insight::{Inspection, QueryInsight};

pub fn check_projection<S: Clone>(query: &Node<S>) -> Vec<QueryInsight<S>> {
    let mut insights = Vec::new();

    let projections = pipeline(query)
        .iter()
        .filter(|stage| has_name(*stage, Name::Project))
        .filter_map(|stage| stage.component::<HasProjections<S>>());

    for projection in projections {
        let included = fields_named(projection, Name::Include);
        let excluded = fields_named(projection, Name::Exclude);

        if included.is_empty() || excluded.is_empty() {
            continue;
        }

        for inclusion in included {
            if let Some(HasFieldReference::FromSchema {
                source, field_name, ..
            }) = inclusion.component::<HasFieldReference<S>>()
            {
                insights.push(QueryInsight::new(
                    source.clone(),
                    Inspection::InvalidProjection {
                        field: field_name.clone(),
                    },
                ));
            }
        }
    }

    insights
}

/// Projected fields with the given operator, `_id` left out
fn fields_named<S>(projection: &HasProjections<S>, name: Name) -> Vec<&Node<S>> {
    projection
        .children
        .iter()
        .filter(|child| operation(*child) == Some(name))
        .filter(|child| schema_field_name(*child) != Some("_id"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mql::parser::parse_query;
    use crate::mql::Namespace;
    use serde_json::{json, Value};

    fn aggregate(pipeline: Value) -> Node<()> {
        parse_query(&Namespace::new("shop", "orders"), None, None, Some(&pipeline)).unwrap()
    }

    fn fields(insights: Vec<QueryInsight<()>>) -> Vec<String> {
        insights
            .into_iter()
            .map(|insight| match insight.inspection {
                Inspection::InvalidProjection { field } => field,
                other => panic!("unexpected {:?}", other),
            })
            .collect()
    }

    #[test]
    fn test_mixed_projection() {
        let q = aggregate(json!([{"$project": {"name": 1, "secret": 0, "email": true}}]));
        assert_eq!(fields(check_projection(&q)), vec!["name", "email"]);
    }

    #[test]
    fn test_id_exclusion_is_allowed() {
        let q = aggregate(json!([{"$project": {"_id": 0, "name": 1}}]));
        assert!(check_projection(&q).is_empty());
    }

    #[test]
    fn test_id_inclusion_is_not_reported() {
        let q = aggregate(json!([{"$project": {"_id": 1, "secret": 0}}]));
        assert!(check_projection(&q).is_empty());
    }

    #[test]
    fn test_every_project_stage_is_checked() {
        let q = aggregate(json!([
            {"$project": {"a": 1}},
            {"$project": {"b": 1, "c": 0}}
        ]));
        assert_eq!(fields(check_projection(&q)), vec!["b"]);
    }
}
