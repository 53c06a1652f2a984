//! Queries that read a whole collection without filtering

use crate::mql::extract::{command, filters, pipeline, stage_name};
use crate::mql::{Name, Node};

use super::insight::{Inspection, QueryInsight};

/// Reports a query that can use indexes but filters nothing: no filter
/// predicates and no leading `$match` with predicates.
pub fn check_filter_usage<S: Clone>(query: &Node<S>) -> Vec<QueryInsight<S>> {
    let uses_indexes = command(query).map(|c| c.uses_indexes()).unwrap_or(false);
    if !uses_indexes {
        return Vec::new();
    }

    let leading_match = pipeline(query)
        .first()
        .filter(|stage| stage_name(*stage) == Some(Name::Match));
    let filtered = !filters(query).is_empty()
        || leading_match.map(|stage| !filters(stage).is_empty()).unwrap_or(false);

    if filtered {
        return Vec::new();
    }
    vec![QueryInsight::new(query.source.clone(), Inspection::QueryNotUsingFilters)]
}
