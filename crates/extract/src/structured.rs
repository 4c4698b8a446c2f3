//! JSON schemas for OpenAI strict structured outputs.
//!
//! Strict mode wants every object closed (`additionalProperties: false`),
//! every property listed in `required`, and no `$ref` indirection, so the
//! schemars output is rewritten before it is sent.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types that can be requested from the model as a structured response.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(schema_for!(Self))?;
        strict_schema(&mut value);
        Ok(value)
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite a schema in place for strict mode.
pub fn strict_schema(value: &mut Value) {
    close_objects(value);

    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(definitions) = definitions {
        inline_refs(value, &definitions);
    }

    if let Value::Object(map) = value {
        map.remove("definitions");
        map.remove("$schema");
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let required = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(required));
                }
            }
            for (_, nested) in map.iter_mut() {
                close_objects(nested);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let target = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
                .cloned();

            if let Some(mut resolved) = target {
                inline_refs(&mut resolved, definitions);
                *value = resolved;
                return;
            }

            for (_, nested) in map.iter_mut() {
                inline_refs(nested, definitions);
            }

            // schemars wraps a documented `$ref` field as a single-entry allOf.
            let single = match map.get("allOf") {
                Some(Value::Array(all)) if all.len() == 1 => all[0].as_object().cloned(),
                _ => None,
            };
            if let Some(inner) = single {
                map.remove("allOf");
                for (key, entry) in inner {
                    map.entry(key).or_insert(entry);
                }
            }
        }
        Value::Array(items) => items
            .iter_mut()
            .for_each(|item| inline_refs(item, definitions)),
        _ => {}
    }
}
