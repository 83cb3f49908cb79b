//! JSON schema builders for MCP tools.

use crate::mcp::handlers::ask::AskToolRequest;
use serde_json::{Map, Value};

/// Build the schema describing the `ask` tool input from its request type.
pub(crate) fn ask_input_schema() -> Map<String, Value> {
    let schema = schemars::schema_for!(AskToolRequest);
    match serde_json::to_value(schema) {
        Ok(Value::Object(mut map)) => {
            map.remove("$schema");
            map.remove("title");
            map
        }
        _ => {
            let mut properties = Map::new();
            properties.insert("question".into(), string_schema("Question to answer"));
            finalize_object_schema(properties, &["question"])
        }
    }
}

/// Build an empty object schema for tools without input.
pub(crate) fn empty_object_schema() -> Map<String, Value> {
    finalize_object_schema(Map::new(), &[])
}

fn string_schema(description: &str) -> Value {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("string".into()));
    schema.insert("description".into(), Value::String(description.into()));
    Value::Object(schema)
}

fn finalize_object_schema(properties: Map<String, Value>, required: &[&str]) -> Map<String, Value> {
    let mut schema = Map::new();
    schema.insert("type".into(), Value::String("object".into()));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert(
            "required".into(),
            Value::Array(
                required
                    .iter()
                    .map(|&key| Value::String(key.into()))
                    .collect(),
            ),
        );
    }
    schema.insert("additionalProperties".into(), Value::Bool(false));
    schema
}
