//! Tool-call fabrication and structured-output synthesis.
//!
//! Given the tools a caller declared, fabricates plausible invocations with
//! JSON arguments matching each tool's parameter schema. Also produces
//! whole-document structured output for `response_format: json_schema`
//! requests. Generation failures never surface: malformed schemas fall back
//! to empty arguments.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::str::FromStr;

use crate::ids;
use crate::schema::SchemaNode;
use crate::types::{ChatCompletionRequest, FunctionCall, Tool, ToolCall};

/// How tools are selected for invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolCallStrategy {
    /// One call per declared tool, in declaration order.
    Sequence,
    /// Each tool included independently with 50% probability.
    ///
    /// The name is historical: selection is random, not keyed to message
    /// content.
    Contextual,
    /// A random non-empty subset in shuffled order.
    #[default]
    Random,
}

impl FromStr for ToolCallStrategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequence" => Ok(ToolCallStrategy::Sequence),
            "contextual" => Ok(ToolCallStrategy::Contextual),
            "random" => Ok(ToolCallStrategy::Random),
            _ => Err(()),
        }
    }
}

/// The strategy a request asks for; unrecognized or absent values fall back
/// to [`ToolCallStrategy::Random`].
pub fn requested_strategy(req: &ChatCompletionRequest) -> ToolCallStrategy {
    req.tool_strategy
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

/// Fabricates tool invocations and structured output.
pub struct ToolCallFabricator {
    rng: StdRng,
    /// Probability that a non-required property appears in structured
    /// output. Policy knob, not protocol.
    pub optional_property_probability: f64,
}

impl Default for ToolCallFabricator {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallFabricator {
    /// Create a fabricator seeded from entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            optional_property_probability: 0.8,
        }
    }

    /// Create a fabricator with an explicit seed for deterministic output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            optional_property_probability: 0.8,
        }
    }

    /// Fabricate calls for the declared tools using the given strategy.
    /// An empty tool list yields an empty result, not an error.
    pub fn generate_tool_calls(&mut self, tools: &[Tool], strategy: ToolCallStrategy) -> Vec<ToolCall> {
        if tools.is_empty() {
            return Vec::new();
        }

        match strategy {
            ToolCallStrategy::Sequence => tools.iter().map(|t| self.fabricate(t)).collect(),
            ToolCallStrategy::Contextual => {
                let mut calls = Vec::new();
                for tool in tools {
                    if self.rng.gen_bool(0.5) {
                        calls.push(self.fabricate(tool));
                    }
                }
                calls
            }
            ToolCallStrategy::Random => {
                let count = self.rng.gen_range(1..=tools.len());
                let mut shuffled: Vec<&Tool> = tools.iter().collect();
                shuffled.shuffle(&mut self.rng);
                shuffled.into_iter().take(count).map(|t| self.fabricate(t)).collect()
            }
        }
    }

    fn fabricate(&mut self, tool: &Tool) -> ToolCall {
        let call_type = if tool.tool_type.is_empty() {
            "function".to_string()
        } else {
            tool.tool_type.clone()
        };
        ToolCall {
            id: ids::tool_call_id(),
            call_type,
            function: FunctionCall {
                name: tool.function.name.clone(),
                arguments: self.generate_arguments(tool.function.parameters.as_ref()),
            },
        }
    }

    /// Build a JSON arguments string for the given parameter schema.
    /// Missing or malformed schemas yield `"{}"`.
    fn generate_arguments(&mut self, parameters: Option<&Value>) -> String {
        let Some(parameters) = parameters else {
            return "{}".to_string();
        };
        match SchemaNode::from_value(parameters) {
            SchemaNode::Object(obj) => {
                let mut out = serde_json::Map::new();
                for (name, node) in &obj.properties {
                    out.insert(name.clone(), self.generate_value(node));
                }
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            }
            _ => "{}".to_string(),
        }
    }

    /// Synthesize a value matching a schema node.
    pub fn generate_value(&mut self, node: &SchemaNode) -> Value {
        match node {
            SchemaNode::String { enum_values } => match enum_values.first() {
                Some(first) => json!(first),
                None => json!(format!("str-{}", self.rng.gen_range(0..1000))),
            },
            SchemaNode::Number => json!(self.rng.gen_range(0.0..100.0)),
            SchemaNode::Integer => json!(self.rng.gen_range(0..100)),
            SchemaNode::Boolean => json!(self.rng.gen_bool(0.5)),
            SchemaNode::Array(items) => json!([self.generate_value(items)]),
            SchemaNode::Object(obj) => {
                let mut out = serde_json::Map::new();
                for (name, child) in &obj.properties {
                    out.insert(name.clone(), self.generate_value(child));
                }
                Value::Object(out)
            }
            SchemaNode::Unknown => json!(format!("val-{}", self.rng.gen_range(0..1000))),
        }
    }

    /// Generate a JSON document for a `response_format: json_schema` request.
    ///
    /// Only object roots are supported; anything else yields `"{}"`.
    /// Required properties are always present; optional properties appear
    /// with [`Self::optional_property_probability`].
    pub fn generate_structured_output(&mut self, schema: &SchemaNode) -> String {
        let SchemaNode::Object(obj) = schema else {
            return "{}".to_string();
        };

        let mut out = serde_json::Map::new();
        for (name, node) in &obj.properties {
            if obj.is_required(name) || self.rng.gen_bool(self.optional_property_probability) {
                out.insert(name.clone(), self.generate_value(node));
            }
        }
        serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
    }
}
