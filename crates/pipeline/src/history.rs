//! The record of tool calls made while planning one question.

use retrieval::truncate_chars;
use serde::Serialize;
use serde_json::{Map, Value};

/// One executed tool call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolRecord {
    pub action: String,
    pub args: Map<String, Value>,
    pub result: Value,
    /// Why the call was made on the planner's behalf, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolHistory {
    records: Vec<ToolRecord>,
}

impl ToolHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ToolRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ToolRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&ToolRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the previous call was `action` with exactly these arguments.
    ///
    /// Argument maps compare structurally, so key order does not matter.
    pub fn repeats(&self, action: &str, args: &Map<String, Value>) -> bool {
        self.last()
            .is_some_and(|last| last.action == action && &last.args == args)
    }

    /// JSON rendering for prompts, capped at `max_chars`; `[]` when empty
    pub fn render(&self, max_chars: usize) -> String {
        if self.records.is_empty() {
            return "[]".to_string();
        }
        let payload = serde_json::to_string(&self.records).unwrap_or_else(|_| "[]".to_string());
        truncate_chars(&payload, max_chars)
    }
}
