//! JSON Schema handling for tool arguments
//!
//! Schemas are generated from typed argument structs and checked with a small
//! validator covering the subset they use: `type` (including type arrays for
//! optional fields), `properties`, `required`, `additionalProperties: false`,
//! `items`, `enum`, `minimum` and `maximum`. Other keywords are ignored.

use rmcp::schemars::{self, JsonSchema};
use serde_json::{json, Map, Value};

/// Generate the input schema for a typed argument struct
pub fn input_schema_for<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({ "type": "object" }));

    // Keep the advertised schema small
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64()
                || value.is_u64()
                || value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => true,
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn at(path: &str) -> &str {
    if path.is_empty() {
        "arguments"
    } else {
        path
    }
}

/// Validate `value` against `schema`, returning a message naming the offending field
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    validate_at(schema, value, "")
}

fn validate_at(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        // `true` or a missing schema accepts anything
        return Ok(());
    };

    match schema.get("type") {
        Some(Value::String(expected)) if !type_matches(expected, value) => {
            return Err(format!(
                "{}: expected {}, got {}",
                at(path),
                expected,
                describe(value)
            ));
        }
        Some(Value::Array(options)) => {
            let matched = options
                .iter()
                .filter_map(Value::as_str)
                .any(|expected| type_matches(expected, value));
            if !matched {
                let names: Vec<&str> = options.iter().filter_map(Value::as_str).collect();
                return Err(format!(
                    "{}: expected {}, got {}",
                    at(path),
                    names.join(" or "),
                    describe(value)
                ));
            }
        }
        _ => {}
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            return Err(format!("{}: value {} is not allowed", at(path), value));
        }
    }

    if let Some(n) = value.as_f64() {
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if n < min {
                return Err(format!("{}: {} is below the minimum {}", at(path), n, min));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if n > max {
                return Err(format!("{}: {} is above the maximum {}", at(path), n, max));
            }
        }
    }

    if let Some(obj) = value.as_object() {
        validate_object(schema, obj, path)?;
    }

    if let (Some(items), Some(array)) = (schema.get("items"), value.as_array()) {
        for (i, item) in array.iter().enumerate() {
            validate_at(items, item, &format!("{}[{}]", at(path), i))?;
        }
    }

    Ok(())
}

fn validate_object(schema: &Map<String, Value>, obj: &Map<String, Value>, path: &str) -> Result<(), String> {
    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !obj.contains_key(name) {
                return Err(format!("missing required field '{}'", join(path, name)));
            }
        }
    }

    for (key, field_value) in obj {
        match properties.get(key) {
            Some(field_schema) => validate_at(field_schema, field_value, &join(path, key))?,
            None if schema.get("additionalProperties") == Some(&Value::Bool(false)) => {
                return Err(format!("unknown field '{}'", join(path, key)));
            }
            None => {}
        }
    }

    Ok(())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Args {
        owner: String,
        limit: Option<u32>,
    }

    fn repo_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "owner": { "type": "string" },
                "repo": { "type": "string" },
                "limit": { "type": ["integer", "null"], "minimum": 1, "maximum": 100 }
            },
            "required": ["owner", "repo"],
            "additionalProperties": false
        })
    }

    #[test]
    fn test_accepts_valid_arguments() {
        let schema = repo_schema();
        assert!(validate(&schema, &json!({"owner": "a", "repo": "b"})).is_ok());
        assert!(validate(&schema, &json!({"owner": "a", "repo": "b", "limit": 10})).is_ok());
        assert!(validate(&schema, &json!({"owner": "a", "repo": "b", "limit": null})).is_ok());
    }

    #[test]
    fn test_rejects_missing_required() {
        let err = validate(&repo_schema(), &json!({"owner": "a"})).unwrap_err();
        assert!(err.contains("'repo'"), "{err}");
    }

    #[test]
    fn test_rejects_wrong_types() {
        let err = validate(&repo_schema(), &json!({"owner": 7, "repo": "b"})).unwrap_err();
        assert_eq!(err, "owner: expected string, got number");

        let err = validate(&repo_schema(), &json!({"owner": "a", "repo": "b", "limit": "five"})).unwrap_err();
        assert!(err.contains("integer or null"), "{err}");

        let err = validate(&repo_schema(), &json!(["owner"])).unwrap_err();
        assert_eq!(err, "arguments: expected object, got array");
    }

    #[test]
    fn test_rejects_unknown_fields_and_bounds() {
        let err = validate(&repo_schema(), &json!({"owner": "a", "repo": "b", "branch": "main"})).unwrap_err();
        assert_eq!(err, "unknown field 'branch'");

        let err = validate(&repo_schema(), &json!({"owner": "a", "repo": "b", "limit": 500})).unwrap_err();
        assert!(err.contains("maximum"), "{err}");
    }

    #[test]
    fn test_generated_schema_is_strict() {
        let schema = input_schema_for::<Args>();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"], false);
        assert!(schema.get("$schema").is_none());

        assert!(validate(&schema, &json!({"owner": "a"})).is_ok());
        assert!(validate(&schema, &json!({"owner": "a", "limit": 3})).is_ok());
        assert!(validate(&schema, &json!({"owner": "a", "extra": 1})).is_err());
        assert!(validate(&schema, &json!({})).is_err());
    }
}
