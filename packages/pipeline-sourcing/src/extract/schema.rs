//! Strict response schema for structured extraction.

use schemars::schema_for;
use serde_json::Value;

use crate::types::asset::PipelineResponse;

/// Name reported to the provider for the extraction response schema.
pub const SCHEMA_NAME: &str = "pipeline_assets";

/// JSON schema for [`PipelineResponse`], adjusted for strict mode.
///
/// Strict providers require `additionalProperties: false` and every property
/// listed in `required` on each object; the empty string stands in for
/// unknown values since nullable fields are forbidden.
pub fn strict_response_schema() -> Value {
    let schema = schema_for!(PipelineResponse);
    let mut value = serde_json::to_value(schema).expect("schema serializes");
    enforce_strict(&mut value);
    value
}

fn enforce_strict(value: &mut Value) {
    match value {
        Value::Object(map) => {
            let keys: Option<Vec<Value>> = map
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| props.keys().cloned().map(Value::String).collect());
            if let Some(keys) = keys {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                map.insert("required".to_string(), Value::Array(keys));
            }
            for nested in map.values_mut() {
                enforce_strict(nested);
            }
        }
        Value::Array(items) => {
            for item in items {
                enforce_strict(item);
            }
        }
        _ => {}
    }
}
