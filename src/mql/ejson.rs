//! Extended JSON literal typing
//!
//! Sampled documents and filter literals arrive as JSON. Scalars that JSON
//! cannot express natively (ObjectId, dates, 64-bit and decimal numbers,
//! UUIDs) use the MongoDB Extended JSON wrappers, e.g. `{"$oid": "..."}`.

use chrono::DateTime;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::bson_type::BsonType;

/// UUID binary subtype
const UUID_SUBTYPE: &str = "04";

/// Infers the BSON type of a JSON value
pub fn bson_type_of(value: &Value) -> BsonType {
    match value {
        Value::Null => BsonType::Null,
        Value::Bool(_) => BsonType::Boolean,
        Value::Number(n) => number_type(n),
        Value::String(_) => BsonType::String,
        Value::Array(items) => {
            let element = items
                .iter()
                .map(bson_type_of)
                .reduce(|acc, t| acc.merge(&t))
                .unwrap_or(BsonType::Any);
            BsonType::array(element)
        }
        Value::Object(map) => extended_scalar_type(map).unwrap_or_else(|| {
            BsonType::object(map.iter().map(|(k, v)| (k.clone(), bson_type_of(v))))
        }),
    }
}

/// Whether the value is an Extended JSON scalar wrapper
pub fn is_extended_scalar(value: &Value) -> bool {
    match value {
        Value::Object(map) => extended_scalar_type(map).is_some(),
        _ => false,
    }
}

fn number_type(n: &Number) -> BsonType {
    match n.as_i64() {
        Some(i) if i32::try_from(i).is_ok() => BsonType::Int32,
        Some(_) => BsonType::Int64,
        None if n.is_u64() => BsonType::Int64,
        None => BsonType::Double,
    }
}

/// Type of a single-key Extended JSON wrapper, `None` for plain objects
fn extended_scalar_type(map: &Map<String, Value>) -> Option<BsonType> {
    if map.len() == 2 {
        // legacy binary: {"$binary": "<base64>", "$type": "04"}
        return match (map.get("$binary"), map.get("$type")) {
            (Some(Value::String(_)), Some(Value::String(subtype))) => Some(binary_type(subtype)),
            _ => None,
        };
    }

    let (key, payload) = match map.iter().next() {
        Some(entry) if map.len() == 1 => entry,
        _ => return None,
    };

    match (key.as_str(), payload) {
        ("$oid", Value::String(hex)) if is_object_id(hex) => Some(BsonType::ObjectId),
        ("$date", Value::String(date)) if DateTime::parse_from_rfc3339(date).is_ok() => {
            Some(BsonType::Date)
        }
        ("$date", Value::Number(_)) => Some(BsonType::Date),
        ("$date", Value::Object(inner)) if inner.contains_key("$numberLong") => {
            Some(BsonType::Date)
        }
        ("$numberLong", Value::String(s)) if s.parse::<i64>().is_ok() => Some(BsonType::Int64),
        ("$numberInt", Value::String(s)) if s.parse::<i32>().is_ok() => Some(BsonType::Int32),
        ("$numberDouble", Value::String(s)) if is_double(s) => Some(BsonType::Double),
        ("$numberDecimal", Value::String(_)) => Some(BsonType::Decimal128),
        ("$uuid", Value::String(s)) if Uuid::parse_str(s).is_ok() => Some(BsonType::Uuid),
        ("$binary", Value::Object(inner)) => match inner.get("subType") {
            Some(Value::String(subtype)) => Some(binary_type(subtype)),
            _ => Some(BsonType::Any),
        },
        _ => None,
    }
}

fn binary_type(subtype: &str) -> BsonType {
    if subtype == UUID_SUBTYPE {
        BsonType::Uuid
    } else {
        BsonType::Any
    }
}

fn is_object_id(hex: &str) -> bool {
    hex.len() == 24 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_double(s: &str) -> bool {
    matches!(s, "Infinity" | "-Infinity" | "NaN") || s.parse::<f64>().is_ok()
}
