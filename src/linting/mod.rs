//! Query linters
//!
//! Each linter inspects one query and returns its findings. Linters never
//! fail: when the cluster cannot answer (disconnected, timed out, malformed
//! reply) the linter reports nothing and logs `LINT_SKIPPED` at WARN. A
//! missing warning therefore means "clean or unknown", never "broken".
//!
//! | Linter                | Needs the cluster | Findings                                   |
//! |-----------------------|-------------------|--------------------------------------------|
//! | `check_namespace`     | yes               | missing database/collection, unresolved ns |
//! | `check_fields`        | yes (schema)      | missing field, value type mismatch         |
//! | `check_index_usage`   | yes (explain)     | collection scan, ineffective index         |
//! | `check_filter_usage`  | no                | query without filters                      |
//! | `check_projection`    | no                | mixed inclusion/exclusion projection       |

mod field_checking;
mod filter_usage;
mod index_checking;
mod insight;
mod namespace_checking;
mod projection;

pub use field_checking::{check_fields, check_fields_against};
pub use filter_usage::check_filter_usage;
pub use index_checking::check_index_usage;
pub use insight::{Inspection, InspectionAction, InspectionCategory, QueryInsight};
pub use namespace_checking::check_namespace;
pub use projection::check_projection;

use crate::access::{DataSource, ReadModelError, ReadModelProvider};
use crate::mql::{ExplainPlanType, Node};
use crate::observability::{Event, Logger};

/// Default number of documents sampled to infer a schema
pub const DEFAULT_SAMPLE_SIZE: u64 = 50;

/// Options shared by the linters that query the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintOptions {
    pub sample_size: u64,
    /// Verbosity of the explain run by the index linter
    pub explain_plan: ExplainPlanType,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            explain_plan: ExplainPlanType::Safe,
        }
    }
}

/// Runs every linter on `query`, one after the other
pub async fn lint<S, D, P>(
    data_source: &D,
    read_model: &P,
    query: &Node<S>,
    options: &LintOptions,
) -> Vec<QueryInsight<S>>
where
    S: Clone,
    D: DataSource,
    P: ReadModelProvider<D>,
{
    Logger::trace(Event::LintStart.as_str(), &[("data_source", data_source.id().as_str())]);

    let mut insights = check_namespace(data_source, read_model, query).await;
    insights.extend(check_fields(data_source, read_model, query, options.sample_size).await);
    insights.extend(check_index_usage(data_source, read_model, query, options.explain_plan).await);
    insights.extend(check_filter_usage(query));
    insights.extend(check_projection(query));

    let count = insights.len().to_string();
    Logger::trace(Event::LintComplete.as_str(), &[("insights", count.as_str())]);
    insights
}

/// Logs a linter giving up because the cluster could not answer
pub(crate) fn lint_skipped(linter: &str, err: &ReadModelError) {
    Logger::warn(
        Event::LintSkipped.as_str(),
        &[
            ("code", err.code()),
            ("error", err.to_string().as_str()),
            ("linter", linter),
        ],
    );
}
