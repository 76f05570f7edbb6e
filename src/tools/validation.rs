//! Argument validation against a tool's declared input schema
//!
//! Covers the subset of JSON Schema the built-in tools declare: `type`
//! (single or union), `properties`, `required`, `items`, `enum` and `anyOf`.

use serde_json::Value;

/// Check `args` against `schema`, returning a human-readable reason on mismatch
pub fn validate(schema: &Value, args: &Value) -> std::result::Result<(), String> {
    check(schema, args, "arguments")
}

fn check(schema: &Value, value: &Value, at: &str) -> std::result::Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(any_of) = schema.get("anyOf").and_then(Value::as_array) {
        let mut reasons = Vec::new();
        for option in any_of {
            match check(option, value, at) {
                Ok(()) => return Ok(()),
                Err(reason) => reasons.push(reason),
            }
        }
        if !any_of.is_empty() {
            return Err(reasons.join("; or "));
        }
    }

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(t) => vec![t.as_str()],
            Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|t| matches_type(t, value)) {
            return Err(format!(
                "{} must be of type {}, got {}",
                at,
                allowed.join(" or "),
                type_name(value)
            ));
        }
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(value) {
            return Err(format!("{} must be one of {}", at, Value::Array(options.clone())));
        }
    }

    if let Value::Object(map) = value {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            let missing: Vec<&str> = required
                .iter()
                .filter_map(Value::as_str)
                .filter(|key| !map.contains_key(*key))
                .collect();
            if !missing.is_empty() {
                return Err(format!("missing required property: {}", missing.join(", ")));
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (key, property) in properties {
                if let Some(field) = map.get(key) {
                    check(property, field, key)?;
                }
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (idx, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{}[{}]", at, idx))?;
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
