//! Tool system for agents
//!
//! Tools are described by a JSON-Schema-like [`ToolSchema`] so the agent can
//! advertise them to the model, and executed through the [`Tool`] trait. A
//! [`ToolRegistry`] holds the tools an agent was built with.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messaging::{AgentMessage, MessageContent, MessageMetadata, MessageRole};
use crate::session::SessionKey;

/// JSON Schema definition for tool parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, ToolParameterSchema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ToolParameterSchema>>,

    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Anything else the schema carries (min, max, pattern, ...)
    #[serde(flatten)]
    pub additional: HashMap<String, Value>,
}

impl ToolParameterSchema {
    fn typed(schema_type: &str, description: Option<String>) -> Self {
        Self {
            schema_type: schema_type.to_string(),
            description,
            properties: None,
            required: None,
            items: None,
            enum_values: None,
            additional: HashMap::new(),
        }
    }

    pub fn string(description: impl Into<String>) -> Self {
        Self::typed("string", Some(description.into()))
    }

    pub fn number(description: impl Into<String>) -> Self {
        Self::typed("number", Some(description.into()))
    }

    pub fn integer(description: impl Into<String>) -> Self {
        Self::typed("integer", Some(description.into()))
    }

    pub fn boolean(description: impl Into<String>) -> Self {
        Self::typed("boolean", Some(description.into()))
    }

    pub fn object(
        description: impl Into<String>,
        properties: HashMap<String, ToolParameterSchema>,
        required: Vec<String>,
    ) -> Self {
        Self {
            properties: Some(properties),
            required: Some(required),
            ..Self::typed("object", Some(description.into()))
        }
    }

    pub fn array(description: impl Into<String>, items: ToolParameterSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array", Some(description.into()))
        }
    }

    /// Build a schema from an arbitrary JSON Schema document, keeping the
    /// fields this type models and stashing the rest in `additional`.
    pub fn from_json_schema(schema: &Value) -> Self {
        let schema_type = schema
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("object")
            .to_string();
        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let properties = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, prop)| (name.clone(), Self::from_json_schema(prop)))
                    .collect::<HashMap<_, _>>()
            });
        let required = schema.get("required").and_then(Value::as_array).map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect::<Vec<_>>()
        });
        let items = schema
            .get("items")
            .map(|items| Box::new(Self::from_json_schema(items)));
        let enum_values = schema.get("enum").and_then(Value::as_array).cloned();

        let mut additional = HashMap::new();
        for (key, value) in schema.as_object().into_iter().flatten() {
            if !matches!(
                key.as_str(),
                "type" | "description" | "properties" | "required" | "items" | "enum"
            ) {
                additional.insert(key.clone(), value.clone());
            }
        }

        Self {
            schema_type,
            description,
            properties,
            required,
            items,
            enum_values,
            additional,
        }
    }
}

/// Complete schema definition for a tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    /// Unique, stable name the model uses to call the tool
    pub name: String,
    pub description: String,
    pub parameters: ToolParameterSchema,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameterSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    pub fn no_params(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            ToolParameterSchema {
                properties: Some(HashMap::new()),
                required: Some(Vec::new()),
                ..ToolParameterSchema::typed("object", None)
            },
        )
    }
}

/// Context handed to tool implementations.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Conversation the invocation belongs to
    pub session: SessionKey,
    pub tool_call_id: Option<String>,
}

impl ToolContext {
    pub fn new(session: SessionKey) -> Self {
        Self {
            session,
            tool_call_id: None,
        }
    }

    pub fn with_call_id(mut self, call_id: Option<String>) -> Self {
        self.tool_call_id = call_id;
        self
    }
}

/// Result of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Text(String),
    Json(Value),
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        ToolResult::Text(content.into())
    }

    pub fn json(content: Value) -> Self {
        ToolResult::Json(content)
    }

    /// Convert into the tool message appended to the conversation.
    pub fn into_message(self, tool_name: &str, ctx: &ToolContext) -> AgentMessage {
        let content = match self {
            ToolResult::Text(text) => MessageContent::Text(text),
            ToolResult::Json(value) => MessageContent::Json(value),
        };
        AgentMessage {
            role: MessageRole::Tool,
            content,
            metadata: Some(MessageMetadata {
                tool_call_id: ctx.tool_call_id.clone(),
                tool_name: Some(tool_name.to_string()),
            }),
        }
    }
}

/// Core trait for tool implementations
#[async_trait]
pub trait Tool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    async fn execute(&self, args: Value, ctx: ToolContext) -> anyhow::Result<ToolResult>;
}

pub type ToolBox = Arc<dyn Tool>;

/// Tools available to an agent, keyed by name. Iteration order is by name so
/// the catalogue advertised to the model is stable.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolBox>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register(&mut self, tool: ToolBox) -> &mut Self {
        let name = tool.schema().name;
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "Replacing previously registered tool");
        }
        self
    }

    pub fn register_all<I>(&mut self, tools: I) -> &mut Self
    where
        I: IntoIterator<Item = ToolBox>,
    {
        for tool in tools {
            self.register(tool);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolBox> {
        self.tools.get(name)
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        fn schema(&self) -> ToolSchema {
            let mut props = HashMap::new();
            props.insert("a".to_string(), ToolParameterSchema::number("left"));
            props.insert("b".to_string(), ToolParameterSchema::number("right"));
            ToolSchema::new(
                "add",
                "Add two numbers",
                ToolParameterSchema::object("Operands", props, vec!["a".into(), "b".into()]),
            )
        }

        async fn execute(&self, args: Value, _ctx: ToolContext) -> anyhow::Result<ToolResult> {
            let a = args["a"].as_f64().unwrap_or_default();
            let b = args["b"].as_f64().unwrap_or_default();
            Ok(ToolResult::json(json!({ "sum": a + b })))
        }
    }

    #[tokio::test]
    async fn registry_lookup_and_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AddTool));

        assert!(registry.get("add").is_some());
        assert_eq!(registry.len(), 1);

        let ctx = ToolContext::new(SessionKey::new("actor", "session"))
            .with_call_id(Some("call-1".into()));
        let result = registry
            .get("add")
            .unwrap()
            .execute(json!({"a": 2, "b": 2}), ctx.clone())
            .await
            .unwrap();
        let message = result.into_message("add", &ctx);

        assert_eq!(message.role, MessageRole::Tool);
        assert_eq!(message.content.as_json().unwrap()["sum"], 4.0);
        let metadata = message.metadata.unwrap();
        assert_eq!(metadata.tool_call_id.as_deref(), Some("call-1"));
        assert_eq!(metadata.tool_name.as_deref(), Some("add"));
    }

    #[test]
    fn schema_from_json_keeps_extra_keywords() {
        let schema = ToolParameterSchema::from_json_schema(&json!({
            "type": "object",
            "properties": {
                "city": {"type": "string", "description": "City name", "minLength": 1}
            },
            "required": ["city"],
            "additionalProperties": false
        }));

        assert_eq!(schema.schema_type, "object");
        assert_eq!(schema.required, Some(vec!["city".to_string()]));
        assert_eq!(schema.additional.get("additionalProperties"), Some(&json!(false)));
        let city = &schema.properties.as_ref().unwrap()["city"];
        assert_eq!(city.description.as_deref(), Some("City name"));
        assert_eq!(city.additional.get("minLength"), Some(&json!(1)));
    }

    #[test]
    fn no_params_schema_serializes_as_empty_object() {
        let schema = ToolSchema::no_params("ping", "Ping");
        let value = serde_json::to_value(&schema.parameters).unwrap();
        assert_eq!(value, json!({"type": "object", "properties": {}, "required": []}));
    }
}
