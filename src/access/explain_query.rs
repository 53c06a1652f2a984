//! Explain plan slice
//!
//! Runs a query as an explain and classifies the winning plan by the most
//! expensive stage in its chain.
//!
//! # Classification
//!
//! | Stage                         | Verdict                 |
//! |-------------------------------|-------------------------|
//! | `COLLSCAN`                    | `CollectionScan`        |
//! | `IXSCAN`, `IDHACK`, `EXPRESS_*` | `IndexScan`           |
//! | `SORT`, `FILTER`              | `IneffectiveIndexUsage` |
//! | anything else                 | `NotRun`                |
//!
//! With execution statistics, examining at least
//! `INEFFECTIVE_EXAMINED_RATIO` documents per returned document is
//! ineffective regardless of the stages.

use std::time::Duration;

use serde_json::Value;

use crate::mql::{ExplainPlanType, HasExplain, HasLimit, Node};
use crate::observability::{Event, Logger};

use super::driver::{self, MongoDbDriver, QueryContext};
use super::slice::{Slice, SliceFuture};

/// Documents examined per document returned from which an index is
/// considered ineffective
pub const INEFFECTIVE_EXAMINED_RATIO: f64 = 50.0;

/// How the server would execute a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainPlan {
    /// No plan available: not run, failed, or not recognized
    NotRun,
    IndexScan { index_name: Option<String> },
    /// An index is used but the server still sorts or filters in memory
    IneffectiveIndexUsage { index_name: Option<String> },
    CollectionScan,
}

impl ExplainPlan {
    /// Relative cost; a higher value is a worse plan
    pub fn cost(&self) -> u8 {
        match self {
            ExplainPlan::NotRun => 0,
            ExplainPlan::IndexScan { .. } => 1,
            ExplainPlan::IneffectiveIndexUsage { .. } => 2,
            ExplainPlan::CollectionScan => 3,
        }
    }

    /// The more expensive of two plans, `self` on ties
    pub fn max_cost(self, other: ExplainPlan) -> ExplainPlan {
        if other.cost() > self.cost() {
            other
        } else {
            self
        }
    }

    pub fn index_name(&self) -> Option<&str> {
        match self {
            ExplainPlan::IndexScan { index_name }
            | ExplainPlan::IneffectiveIndexUsage { index_name } => index_name.as_deref(),
            _ => None,
        }
    }

    fn from_cost(cost: u8, index_name: Option<String>) -> Self {
        match cost {
            0 => ExplainPlan::NotRun,
            1 => ExplainPlan::IndexScan { index_name },
            2 => ExplainPlan::IneffectiveIndexUsage { index_name },
            _ => ExplainPlan::CollectionScan,
        }
    }
}

/// Explain of a query with the given verbosity
#[derive(Debug, Clone)]
pub struct ExplainQuery {
    query: Node<()>,
    explain_type: ExplainPlanType,
}

impl ExplainQuery {
    pub fn new<S>(query: &Node<S>, explain_type: ExplainPlanType) -> Self {
        Self {
            query: query.erase_source(),
            explain_type,
        }
    }
}

impl Slice for ExplainQuery {
    type Output = ExplainPlan;

    fn id(&self) -> String {
        format!("ExplainQuery::{:?}::{:?}", self.explain_type, self.query)
    }

    fn query_using_driver<'a>(
        &'a self,
        driver: &'a dyn MongoDbDriver,
        timeout: Duration,
    ) -> SliceFuture<'a, ExplainPlan> {
        Box::pin(async move {
            if self.explain_type == ExplainPlanType::None {
                return Ok(ExplainPlan::NotRun);
            }

            let query = self
                .query
                .clone()
                .with(HasLimit(1))
                .with(HasExplain(self.explain_type));

            let context = QueryContext::explain(self.explain_type);
            let document = match driver::run(driver, &query, context, timeout).await {
                Ok(document) => document,
                Err(_) => return Ok(ExplainPlan::NotRun),
            };

            Ok(classify_explain(&document).unwrap_or_else(|| {
                Logger::warn(Event::ExplainDecodeFailed.as_str(), &[("reason", "no winning plan")]);
                ExplainPlan::NotRun
            }))
        })
    }
}

/// Classifies an explain document. `None` when it has no winning plan.
pub fn classify_explain(document: &Value) -> Option<ExplainPlan> {
    let plan = winning_plan(document)?;

    let mut cost = 0;
    let mut index_name = None;
    walk_stages(plan, &mut cost, &mut index_name);

    if let Some(ratio) = examined_ratio(document) {
        if ratio >= INEFFECTIVE_EXAMINED_RATIO {
            cost = cost.max(ExplainPlan::IneffectiveIndexUsage { index_name: None }.cost());
        }
    }

    Some(ExplainPlan::from_cost(cost, index_name))
}

fn planner_section<'a>(document: &'a Value, section: &str) -> Option<&'a Value> {
    document
        .get(section)
        .or_else(|| document.get("stages")?.get(0)?.get("$cursor")?.get(section))
}

fn winning_plan(document: &Value) -> Option<&Value> {
    let winning = planner_section(document, "queryPlanner")?.get("winningPlan")?;
    Some(winning.get("queryPlan").unwrap_or(winning))
}

fn walk_stages(stage: &Value, cost: &mut u8, index_name: &mut Option<String>) {
    let name = stage.get("stage").and_then(Value::as_str).unwrap_or_default();
    *cost = (*cost).max(stage_cost(name));

    if index_name.is_none() {
        if let Some(name) = stage.get("indexName").and_then(Value::as_str) {
            *index_name = Some(name.to_string());
        }
    }

    if let Some(input) = stage.get("inputStage") {
        walk_stages(input, cost, index_name);
    }
    if let Some(inputs) = stage.get("inputStages").and_then(Value::as_array) {
        for input in inputs {
            walk_stages(input, cost, index_name);
        }
    }
}

fn stage_cost(stage: &str) -> u8 {
    match stage {
        "COLLSCAN" => 3,
        "SORT" | "FILTER" => 2,
        "IXSCAN" | "IDHACK" => 1,
        s if s.starts_with("EXPRESS_") => 1,
        _ => 0,
    }
}

/// `totalDocsExamined / nReturned`; nothing returned counts as one
fn examined_ratio(document: &Value) -> Option<f64> {
    let stats = planner_section(document, "executionStats")?;
    let examined = stats.get("totalDocsExamined")?.as_f64()?;
    let returned = stats.get("nReturned")?.as_f64()?.max(1.0);
    Some(examined / returned)
}
