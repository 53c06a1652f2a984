//! Index usage checks based on the server's explain plan

use crate::access::{DataSource, ExplainPlan, ExplainQuery, ReadModelProvider};
use crate::mql::extract::command;
use crate::mql::{ExplainPlanType, HasCollectionReference, Node};

use super::insight::{Inspection, QueryInsight};
use super::lint_skipped;

/// Explains `query` and reports a collection scan or an index used
/// ineffectively. Commands that never use indexes are not explained.
pub async fn check_index_usage<S, D, P>(
    data_source: &D,
    read_model: &P,
    query: &Node<S>,
    explain_plan: ExplainPlanType,
) -> Vec<QueryInsight<S>>
where
    S: Clone,
    D: DataSource,
    P: ReadModelProvider<D>,
{
    let uses_indexes = command(query).map(|c| c.uses_indexes()).unwrap_or(false);
    let has_namespace = query
        .component::<HasCollectionReference<S>>()
        .and_then(HasCollectionReference::namespace)
        .map(|namespace| namespace.is_valid())
        .unwrap_or(false);
    if !uses_indexes || !has_namespace || explain_plan == ExplainPlanType::None {
        return Vec::new();
    }

    let plan = match read_model
        .slice(data_source, ExplainQuery::new(query, explain_plan))
        .await
    {
        Ok(plan) => plan,
        Err(err) => {
            lint_skipped("index_checking", &err);
            return Vec::new();
        }
    };

    let inspection = match plan {
        ExplainPlan::CollectionScan => Inspection::QueryNotCoveredByIndex,
        ExplainPlan::IneffectiveIndexUsage { index_name } => {
            Inspection::QueryNotUsingEffectiveIndex { index_name }
        }
        ExplainPlan::IndexScan { .. } | ExplainPlan::NotRun => return Vec::new(),
    };

    vec![QueryInsight::new(query.source.clone(), inspection)]
}
