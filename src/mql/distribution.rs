//! Per-field value distribution of sampled documents
//!
//! For every dotted field path observed in the samples, the distribution
//! records which share of documents (in percent) holds each value. Objects
//! and arrays are recorded under marker values and recursed into, and a
//! document that lacks a known path counts under `Undefined`, so each
//! path's percentages add up to 100.
//!
//! A path that occurs several times in one document (inside an array of
//! sub-documents) splits that document's weight evenly between its values.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};

use super::ejson::is_extended_scalar;

/// A distinct observed value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DistributionValue {
    /// Field path absent from the document
    Undefined,
    /// Sub-document
    Object,
    /// Array of any content
    Array,
    Null,
    Boolean(bool),
    /// Number in canonical text form, so `10`, `10.0` and
    /// `{"$numberLong": "10"}` share a key
    Number(String),
    String(String),
    /// Extended JSON scalar in its JSON text form
    Extended(String),
}

impl From<&Value> for DistributionValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => DistributionValue::Null,
            Value::Bool(b) => DistributionValue::Boolean(*b),
            Value::Number(n) => DistributionValue::Number(canonical_number(n)),
            Value::String(s) => DistributionValue::String(s.clone()),
            Value::Array(_) => DistributionValue::Array,
            Value::Object(_) if is_extended_scalar(value) => match extended_number(value) {
                Some(number) => DistributionValue::Number(number),
                None => DistributionValue::Extended(value.to_string()),
            },
            Value::Object(_) => DistributionValue::Object,
        }
    }
}

impl fmt::Display for DistributionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionValue::Undefined => write!(f, "$undefined"),
            DistributionValue::Object => write!(f, "$object"),
            DistributionValue::Array => write!(f, "$array"),
            DistributionValue::Null => write!(f, "null"),
            DistributionValue::Boolean(b) => write!(f, "{}", b),
            DistributionValue::Number(n) => write!(f, "{}", n),
            DistributionValue::String(s) => write!(f, "{:?}", s),
            DistributionValue::Extended(s) => write!(f, "{}", s),
        }
    }
}

/// Occurrence percentage of each value, per field path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataDistribution {
    distribution: BTreeMap<String, BTreeMap<DistributionValue, f64>>,
}

impl DataDistribution {
    /// Builds the distribution of a sample. Non-object samples count as
    /// documents without fields.
    pub fn generate(samples: &[Value]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut counts: BTreeMap<String, BTreeMap<DistributionValue, f64>> = BTreeMap::new();
        let mut paths_per_document: Vec<BTreeSet<String>> = Vec::with_capacity(samples.len());

        for sample in samples {
            let mut occurrences: BTreeMap<String, Vec<DistributionValue>> = BTreeMap::new();
            if let Value::Object(document) = sample {
                collect_occurrences(document, "", &mut occurrences);
            }

            for (path, values) in &occurrences {
                let weight = 1.0 / values.len() as f64;
                let path_counts = counts.entry(path.clone()).or_default();
                for value in values {
                    *path_counts.entry(value.clone()).or_insert(0.0) += weight;
                }
            }

            paths_per_document.push(occurrences.into_keys().collect());
        }

        for document_paths in &paths_per_document {
            for (path, path_counts) in counts.iter_mut() {
                if !document_paths.contains(path) {
                    *path_counts.entry(DistributionValue::Undefined).or_insert(0.0) += 1.0;
                }
            }
        }

        let total = samples.len() as f64;
        let distribution = counts
            .into_iter()
            .map(|(path, path_counts)| {
                let percentages = path_counts
                    .into_iter()
                    .map(|(value, count)| (value, count * 100.0 / total))
                    .collect();
                (path, percentages)
            })
            .collect();

        Self { distribution }
    }

    /// Percentage of documents whose `path` holds `value`.
    ///
    /// Lower means rarer, and a more selective predicate.
    ///
    /// Sub-document and array literals have no selectivity: the `Object`
    /// and `Array` markers only count shapes, not values.
    pub fn selectivity_of(&self, path: &str, value: &Value) -> Option<f64> {
        match value {
            Value::Array(_) => return None,
            Value::Object(_) if !is_extended_scalar(value) => return None,
            _ => {}
        }
        self.distribution
            .get(path)
            .and_then(|values| values.get(&DistributionValue::from(value)))
            .copied()
    }

    pub fn distribution_for_path(&self, path: &str) -> Option<&BTreeMap<DistributionValue, f64>> {
        self.distribution.get(path)
    }

    /// Observed field paths, sorted
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.distribution.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.distribution.is_empty()
    }

    /// JSON rendering: `{path: {value: percentage}}`
    pub fn to_json(&self) -> Value {
        let paths = self
            .distribution
            .iter()
            .map(|(path, values)| {
                let values: Map<String, Value> = values
                    .iter()
                    .map(|(value, percentage)| (value.to_string(), Value::from(*percentage)))
                    .collect();
                (path.clone(), Value::Object(values))
            })
            .collect();
        Value::Object(paths)
    }
}

fn canonical_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map_or_else(|| n.to_string(), canonical_float)
    }
}

/// Integral floats print without a fraction, like integers
fn canonical_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        (f as i64).to_string()
    } else {
        f.to_string()
    }
}

/// `$numberInt`, `$numberLong` and `$numberDouble` as canonical text
fn extended_number(value: &Value) -> Option<String> {
    let (key, text) = match value {
        Value::Object(map) if map.len() == 1 => map.iter().next()?,
        _ => return None,
    };
    let text = text.as_str()?;
    match key.as_str() {
        "$numberInt" | "$numberLong" => text.parse::<i64>().ok().map(|i| i.to_string()),
        "$numberDouble" => text.parse::<f64>().ok().map(canonical_float),
        _ => None,
    }
}

fn collect_occurrences(
    document: &Map<String, Value>,
    prefix: &str,
    occurrences: &mut BTreeMap<String, Vec<DistributionValue>>,
) {
    for (field, value) in document {
        let path = if prefix.is_empty() {
            field.clone()
        } else {
            format!("{}.{}", prefix, field)
        };

        occurrences
            .entry(path.clone())
            .or_default()
            .push(DistributionValue::from(value));

        match value {
            Value::Object(inner) if !is_extended_scalar(value) => {
                collect_occurrences(inner, &path, occurrences);
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(inner) = item {
                        if !is_extended_scalar(item) {
                            collect_occurrences(inner, &path, occurrences);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}
