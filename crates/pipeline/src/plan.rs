//! Planner replies, validated.
//!
//! The planner must answer with one bare JSON object, either
//! `{"action": "<tool>", "args": {...}}` or `{"action": "final", "answer": "..."}`.
//! Anything else (prose, markdown fences, arrays, a missing action) is an
//! invalid plan; there is no attempt to dig an object out of surrounding text.

use retrieval::{ToolCall, ToolName};
use serde_json::{Map, Value};

/// The action name that ends planning
pub const FINAL_ACTION: &str = "final";

/// One parsed planner step
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Stop and answer; `answer` is trimmed and may be empty
    Final { answer: String },
    /// Run a known tool. `args` is kept raw for history and repeat detection.
    Call {
        call: ToolCall,
        args: Map<String, Value>,
    },
    /// Well-formed, but names no tool we have
    UnknownTool { name: String },
    Invalid { reason: String },
}

impl Plan {
    pub fn parse(text: &str) -> Plan {
        let value: Value = match serde_json::from_str(text.trim()) {
            Ok(value) => value,
            Err(e) => {
                return Plan::Invalid {
                    reason: format!("not JSON: {e}"),
                };
            }
        };
        let Value::Object(object) = value else {
            return Plan::Invalid {
                reason: "not a JSON object".into(),
            };
        };

        let action = match object.get("action").and_then(Value::as_str).map(str::trim) {
            Some(action) if !action.is_empty() => action,
            _ => {
                return Plan::Invalid {
                    reason: "missing action".into(),
                };
            }
        };

        if action == FINAL_ACTION {
            let answer = object
                .get("answer")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            return Plan::Final { answer };
        }

        match ToolName::parse(action) {
            Some(tool) => {
                let args = match object.get("args") {
                    Some(Value::Object(args)) => args.clone(),
                    _ => Map::new(),
                };
                Plan::Call {
                    call: ToolCall::from_args(tool, &args),
                    args,
                }
            }
            None => Plan::UnknownTool {
                name: action.to_string(),
            },
        }
    }
}
