//! Tool parameter schemas and argument checking.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// JSON Schema object describing a tool's arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    pub schema: Value,
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::empty()
    }
}

impl ToolParameters {
    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// A tool that takes no arguments.
    pub fn empty() -> Self {
        Self::object().build()
    }

    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }

    /// Check `args` against the schema's top level.
    ///
    /// Verifies the object shape, required keys and declared property types.
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        if self.schema.get("type").and_then(Value::as_str) == Some("object") && !args.is_object() {
            return Err(format!("expected an object, got {}", type_name(args)));
        }
        let Some(obj) = args.as_object() else {
            return Ok(());
        };

        let required = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        if let Some(missing) = required.into_iter().find(|key| !obj.contains_key(*key)) {
            return Err(format!("missing required field '{missing}'"));
        }

        let Some(properties) = self.schema.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        for (key, value) in obj {
            let expected = properties
                .get(key)
                .and_then(|p| p.get("type"))
                .and_then(Value::as_str);
            if let Some(expected) = expected {
                if !matches_type(value, expected) {
                    return Err(format!(
                        "field '{key}' should be {expected}, got {}",
                        type_name(value)
                    ));
                }
            }
        }
        Ok(())
    }

    /// One line per property, for the tool catalog.
    pub fn describe(&self) -> Vec<String> {
        let required: Vec<&str> = self
            .schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        let Some(properties) = self.schema.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };
        properties
            .iter()
            .map(|(name, prop)| {
                let kind = prop.get("type").and_then(Value::as_str).unwrap_or("any");
                let flag = if required.contains(&name.as_str()) {
                    ", required"
                } else {
                    ""
                };
                let mut line = format!("{name} ({kind}{flag})");
                if let Some(desc) = prop.get("description").and_then(Value::as_str) {
                    line.push_str(": ");
                    line.push_str(desc);
                }
                if let Some(values) = prop.get("enum").and_then(Value::as_array) {
                    let values: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
                    line.push_str(&format!(" [{}]", values.join("|")));
                }
                line
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn property(mut self, name: &str, prop: Value, required: bool) -> Self {
        self.properties.insert(name.to_string(), prop);
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    pub fn string(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({"type": "string", "description": description}), required)
    }

    pub fn number(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({"type": "number", "description": description}), required)
    }

    pub fn integer(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({"type": "integer", "description": description}), required)
    }

    pub fn boolean(self, name: &str, description: &str, required: bool) -> Self {
        self.property(name, json!({"type": "boolean", "description": description}), required)
    }

    pub fn string_enum(self, name: &str, description: &str, values: &[&str], required: bool) -> Self {
        self.property(
            name,
            json!({"type": "string", "description": description, "enum": values}),
            required,
        )
    }

    pub fn build(self) -> ToolParameters {
        ToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}

fn matches_type(value: &Value, expected: &str) -> bool {
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
