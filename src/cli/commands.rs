//! CLI command implementations
//!
//! Commands work offline: whatever they know about a collection comes from
//! the sample documents in the request.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AnalyzerConfig;
use crate::indexing::{analyze, SuggestedIndex};
use crate::linting::check_fields_against;
use crate::mql::parser::parse_query;
use crate::mql::{CollectionSchema, HasCollectionReference, Namespace, Node};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_error, write_response};

#[derive(Debug, Deserialize)]
struct AnalyzeNamespaceRequest {
    namespace: String,
    #[serde(default)]
    samples: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    filter: Option<Value>,
    #[serde(default)]
    sort: Option<Value>,
    #[serde(default)]
    pipeline: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SuggestIndexRequest {
    namespace: String,
    #[serde(default)]
    samples: Vec<Value>,
    queries: Vec<QueryRequest>,
}

#[derive(Debug, Deserialize)]
struct LintFieldsRequest {
    namespace: String,
    samples: Vec<Value>,
    filter: Value,
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a command: load the config, read the request, write the response.
///
/// Failures are also reported on stdout as an error response.
pub fn run_command(cmd: Command) -> CliResult<()> {
    let result = execute(&cmd);

    match result {
        Ok(data) => write_response(data),
        Err(e) => {
            write_error(e.code(), &e.to_string())?;
            Err(e)
        }
    }
}

fn execute(cmd: &Command) -> CliResult<Value> {
    let config = AnalyzerConfig::load(cmd.config_path())?;
    let request = read_request()?;

    match cmd {
        Command::AnalyzeNamespace { .. } => analyze_namespace(&request, &config),
        Command::SuggestIndex { .. } => suggest_index(&request, &config),
        Command::LintFields { .. } => lint_fields(&request, &config),
    }
}

/// Schema, field list and value distribution of the sampled documents
pub fn analyze_namespace(request: &Value, config: &AnalyzerConfig) -> CliResult<Value> {
    let request: AnalyzeNamespaceRequest = serde_json::from_value(request.clone())?;
    let namespace = Namespace::from_str(&request.namespace)?;

    Ok(sample_schema(namespace, &request.samples, config).to_json())
}

/// Index for the first query, consolidated with the others
pub fn suggest_index(request: &Value, config: &AnalyzerConfig) -> CliResult<Value> {
    let request: SuggestIndexRequest = serde_json::from_value(request.clone())?;
    let namespace = Namespace::from_str(&request.namespace)?;
    let schema = if request.samples.is_empty() {
        None
    } else {
        Some(sample_schema(namespace.clone(), &request.samples, config))
    };

    let mut queries = Vec::with_capacity(request.queries.len());
    for query in &request.queries {
        let node = parse_query(
            &namespace,
            query.filter.as_ref(),
            query.sort.as_ref(),
            query.pipeline.as_ref(),
        )?;
        queries.push(attach_schema(node, schema.as_ref()));
    }

    let (base, siblings) = queries
        .split_first()
        .ok_or_else(|| CliError::invalid_request("queries must not be empty"))?;
    let finder = |_: &Node<()>| siblings.to_vec();

    let index = match analyze(base, &finder, &config.consolidation_options()) {
        SuggestedIndex::MongoDbIndex(index) => index,
        SuggestedIndex::NoIndex => return Ok(json!({ "index": null })),
    };

    let fields: Vec<Value> = index
        .fields
        .iter()
        .map(|f| {
            json!({
                "field": f.field_name,
                "direction": f.direction,
                "reason": f.reason,
            })
        })
        .collect();

    Ok(json!({
        "index": {
            "fields": fields,
            "partialFilterExpression": index.partial_filter_document(),
        },
        "coveredQueries": index.covered_queries.len(),
        "script": index.create_index_script(),
    }))
}

/// Field checks of one filter against the sampled documents
pub fn lint_fields(request: &Value, config: &AnalyzerConfig) -> CliResult<Value> {
    let request: LintFieldsRequest = serde_json::from_value(request.clone())?;
    let namespace = Namespace::from_str(&request.namespace)?;
    let schema = sample_schema(namespace.clone(), &request.samples, config);

    let query = parse_query(&namespace, Some(&request.filter), None, None)?;
    let insights: Vec<Value> = check_fields_against(&query, &schema)
        .iter()
        .map(|insight| insight.inspection.to_json())
        .collect();

    Ok(Value::Array(insights))
}

/// Schema of at most `sample_size` of the given documents
fn sample_schema(namespace: Namespace, samples: &[Value], config: &AnalyzerConfig) -> CollectionSchema {
    let limit = usize::try_from(config.sample_size).unwrap_or(usize::MAX);
    let samples = &samples[..samples.len().min(limit)];
    CollectionSchema::from_samples(namespace, samples)
}

fn attach_schema(query: Node<()>, schema: Option<&CollectionSchema>) -> Node<()> {
    let (schema, reference) = match (schema, query.component::<HasCollectionReference<()>>()) {
        (Some(schema), Some(reference)) => (schema, reference.clone()),
        _ => return query,
    };
    query.with(reference.with_schema(schema.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyze_namespace() {
        let request = json!({
            "namespace": "shop.orders",
            "samples": [{"status": "A", "qty": 1}, {"status": "B"}]
        });
        let data = analyze_namespace(&request, &AnalyzerConfig::default()).unwrap();

        assert_eq!(data["namespace"], "shop.orders");
        assert_eq!(data["fields"]["status"], "String");
        assert!(data["distribution"].is_object());
    }

    #[test]
    fn test_analyze_namespace_rejects_bad_namespace() {
        let request = json!({"namespace": "orders", "samples": []});
        let err = analyze_namespace(&request, &AnalyzerConfig::default()).unwrap_err();
        assert_eq!(err.code(), "MQL_INVALID_NAMESPACE");
    }

    #[test]
    fn test_suggest_index() {
        let request = json!({
            "namespace": "shop.orders",
            "queries": [
                {"filter": {"status": "A"}, "sort": {"created": -1}},
                {"filter": {"status": "B", "qty": {"$gt": 5}}, "sort": {"created": -1}}
            ]
        });
        let data = suggest_index(&request, &AnalyzerConfig::default()).unwrap();

        let fields: Vec<&str> = data["index"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["status", "created", "qty"]);
        assert_eq!(data["index"]["fields"][1]["direction"], "descending");
        assert_eq!(data["index"]["fields"][2]["reason"], "ROLE_RANGE");
        assert_eq!(data["coveredQueries"], 2);
        assert_eq!(
            data["script"],
            r#"db.getSiblingDB("shop").getCollection("orders").createIndex({ "status": 1, "created": -1, "qty": 1 })"#
        );
    }

    #[test]
    fn test_suggest_index_requires_queries() {
        let request = json!({"namespace": "shop.orders", "queries": []});
        let err = suggest_index(&request, &AnalyzerConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::InvalidRequest(_)));
    }

    #[test]
    fn test_lint_fields() {
        let request = json!({
            "namespace": "db.coll",
            "samples": [{"myString": "a", "myInt": 1}],
            "filter": {"myBoolean": true, "myString": 42}
        });
        let data = lint_fields(&request, &AnalyzerConfig::default()).unwrap();

        let codes: Vec<&str> = data
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["FIELD_DOES_NOT_EXIST", "FIELD_VALUE_TYPE_MISMATCH"]);
    }

    #[test]
    fn test_sample_size_limits_schema() {
        let config = AnalyzerConfig {
            sample_size: 1,
            ..AnalyzerConfig::default()
        };
        let request = json!({
            "namespace": "db.coll",
            "samples": [{"a": 1}, {"b": 1}]
        });
        let data = analyze_namespace(&request, &config).unwrap();
        assert!(data["fields"].get("b").is_none());
    }
}
