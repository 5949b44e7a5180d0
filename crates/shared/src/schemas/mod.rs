// crates/shared/src/schemas/mod.rs
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ToolSchema {
    pub name: &'static str,
    pub toolbelt: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSchema>,
}

#[derive(Debug, Clone)]
pub struct ParameterSchema {
    pub name: &'static str,
    pub type_name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    pub fn to_tool(&self) -> Tool {
        let mut properties = json!({});
        let mut required = vec![];

        for param in &self.parameters {
            let mut property = json!({
                "type": param.type_name,
                "description": param.description
            });
            if let Some(default) = param.default.filter(|d| !d.is_empty()) {
                property["default"] = json!(default);
            }
            if param.type_name == "array" {
                property["items"] = json!({ "type": "string" });
            }
            properties[param.name] = property;
            if param.required {
                required.push(param.name);
            }
        }

        Tool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: self.name.to_string(),
                description: self.description.to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": properties,
                    "required": required
                }),
            },
        }
    }
}

/// Errors a tool reports back to the model instead of aborting the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// A named group of tools sharing one instance, e.g. an HTTP client.
#[async_trait]
pub trait Toolbelt: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn schemas(&self) -> &[ToolSchema];

    /// Run one tool. Failures downcasting to [`ToolError`] are recoverable;
    /// anything else aborts the agent run.
    async fn call(&self, tool: &str, args: &Value) -> anyhow::Result<String>;

    fn tools(&self) -> Vec<Tool> {
        self.schemas().iter().map(|s| s.to_tool()).collect()
    }

    fn has_tool(&self, tool: &str) -> bool {
        self.schemas().iter().any(|s| s.name == tool)
    }
}

/// Read a string argument, falling back to `default` when absent or null.
pub fn str_arg<'a>(args: &'a Value, name: &str, default: &'a str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{}' must be a string, got {}",
            name, other
        ))),
    }
}

/// Read a required string argument.
pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    match args.get(name) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.as_str()),
        _ => Err(ToolError::InvalidArguments(format!("'{}' is required", name))),
    }
}

/// Read a list of strings. A lone string counts as a one-item list.
pub fn str_list<'a>(args: &'a Value, name: &str, required: bool) -> Result<Vec<&'a str>, ToolError> {
    match args.get(name) {
        None | Some(Value::Null) if !required => Ok(Vec::new()),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(vec![s.as_str()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().ok_or_else(|| {
                    ToolError::InvalidArguments(format!("'{}' must be a list of strings", name))
                })
            })
            .collect(),
        _ => Err(ToolError::InvalidArguments(format!("'{}' is required", name))),
    }
}

/// Read a required non-negative integer, accepting numeric strings.
pub fn required_u64(args: &Value, name: &str) -> Result<u64, ToolError> {
    let value = match args.get(name) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    value.ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a whole number", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ToolSchema {
        ToolSchema {
            name: "get_exchange_rate",
            toolbelt: "ExchangeRate",
            description: "Retrieve an exchange rate",
            parameters: vec![
                ParameterSchema {
                    name: "currency_from",
                    type_name: "string",
                    description: "Base currency",
                    required: false,
                    default: Some("USD"),
                },
                ParameterSchema {
                    name: "amount",
                    type_name: "number",
                    description: "Amount",
                    required: true,
                    default: None,
                },
            ],
        }
    }

    #[test]
    fn to_tool_lists_only_required_parameters() {
        let tool = schema().to_tool();
        assert_eq!(tool.tool_type, "function");
        assert_eq!(tool.function.parameters["required"], json!(["amount"]));
        assert_eq!(
            tool.function.parameters["properties"]["currency_from"]["default"],
            json!("USD")
        );
        assert!(tool.function.parameters["properties"]["amount"].get("default").is_none());
    }

    #[test]
    fn array_parameters_carry_item_type_and_blank_defaults_are_hidden() {
        let schema = ToolSchema {
            name: "send_email",
            toolbelt: "Scheduling",
            description: "Send an email",
            parameters: vec![ParameterSchema {
                name: "cc",
                type_name: "array",
                description: "CC recipients",
                required: false,
                default: Some(""),
            }],
        };
        let cc = &schema.to_tool().function.parameters["properties"]["cc"];
        assert_eq!(cc["items"], json!({ "type": "string" }));
        assert!(cc.get("default").is_none());
    }

    #[test]
    fn str_list_accepts_arrays_and_single_strings() {
        let args = json!({ "to": ["ana@example.com", "li@example.com"], "cc": "ops@example.com", "bad": [1] });
        assert_eq!(str_list(&args, "to", true).unwrap().len(), 2);
        assert_eq!(str_list(&args, "cc", false).unwrap(), vec!["ops@example.com"]);
        assert!(str_list(&args, "missing", false).unwrap().is_empty());
        assert!(str_list(&args, "missing", true).is_err());
        assert!(str_list(&args, "bad", true).is_err());
    }

    #[test]
    fn required_u64_parses_numbers_and_numeric_strings() {
        assert_eq!(required_u64(&json!({ "minutes": 30 }), "minutes").unwrap(), 30);
        assert_eq!(required_u64(&json!({ "minutes": "45" }), "minutes").unwrap(), 45);
        assert!(required_u64(&json!({ "minutes": -5 }), "minutes").is_err());
        assert!(required_u64(&json!({}), "minutes").is_err());
    }

    #[test]
    fn str_arg_rejects_non_strings() {
        let args = json!({ "currency_from": 12, "currency_to": null });
        assert!(matches!(
            str_arg(&args, "currency_from", "USD"),
            Err(ToolError::InvalidArguments(_))
        ));
        assert_eq!(str_arg(&args, "currency_to", "EUR").unwrap(), "EUR");
        assert_eq!(str_arg(&args, "currency_date", "latest").unwrap(), "latest");
    }

    #[test]
    fn required_str_rejects_blank_values() {
        let args = json!({ "destination": "  " });
        assert!(required_str(&args, "destination").is_err());
        assert!(required_str(&json!({}), "destination").is_err());
        assert_eq!(required_str(&json!({ "destination": "Rome" }), "destination").unwrap(), "Rome");
    }
}
