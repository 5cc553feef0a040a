//! Tool results

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::core::types::truncate_chars;

/// Outcome of one tool call, fed back into the model's context
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "modifiedLines", skip_serializing_if = "Option::is_none")]
    pub modified_lines: Option<Vec<usize>>,
    #[serde(rename = "oldContent", skip_serializing_if = "Option::is_none")]
    pub old_content: Option<String>,
    #[serde(rename = "newContent", skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_lines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line_content: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Create a successful result carrying data
    pub fn success_with_data(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// Create a failed result
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Attach the modified line numbers of a write
    pub fn with_lines(mut self, lines: Vec<usize>) -> Self {
        self.modified_lines = Some(lines);
        self
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| json!({"ok": self.ok}).to_string())
    }

    /// Serialized form for a model context, summarized above `threshold` chars.
    ///
    /// The summary keeps `ok` and `message`, plus the first two entries of
    /// array data or the first 100 characters of string data.
    pub fn compact_for_context(&self, threshold: usize) -> String {
        let full = self.to_json();
        if full.chars().count() <= threshold {
            return full;
        }

        let mut summary = Map::new();
        summary.insert("ok".into(), Value::Bool(self.ok));
        summary.insert(
            "message".into(),
            Value::String(
                self.message
                    .clone()
                    .unwrap_or_else(|| "Operation completed".to_string()),
            ),
        );

        match &self.data {
            Some(Value::Array(items)) => {
                summary.insert("dataCount".into(), json!(items.len()));
                summary.insert(
                    "dataSample".into(),
                    Value::Array(items.iter().take(2).cloned().collect()),
                );
            }
            Some(Value::String(text)) => {
                summary.insert("dataLength".into(), json!(text.chars().count()));
                summary.insert(
                    "dataPreview".into(),
                    Value::String(format!("{}...", truncate_chars(text, 100))),
                );
            }
            _ => {}
        }

        Value::Object(summary).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_result_is_untouched() {
        let result = ToolResult::success("File created").with_lines(vec![1]);
        let compact = result.compact_for_context(500);
        assert_eq!(compact, result.to_json());
        assert!(compact.contains("\"modifiedLines\":[1]"));
    }

    #[test]
    fn test_long_string_data_is_previewed() {
        let result = ToolResult::success_with_data(Value::String("x".repeat(2000)));
        let compact: Value = serde_json::from_str(&result.compact_for_context(500)).unwrap();

        assert_eq!(compact["ok"], true);
        assert_eq!(compact["message"], "Operation completed");
        assert_eq!(compact["dataLength"], 2000);
        assert_eq!(compact["dataPreview"], format!("{}...", "x".repeat(100)));
    }

    #[test]
    fn test_long_array_data_is_sampled() {
        let items: Vec<Value> = (0..100)
            .map(|i| json!({"name": format!("chapter-{i}.md"), "type": "file"}))
            .collect();
        let result = ToolResult::success_with_data(Value::Array(items));
        let compact: Value = serde_json::from_str(&result.compact_for_context(500)).unwrap();

        assert_eq!(compact["dataCount"], 100);
        assert_eq!(compact["dataSample"].as_array().unwrap().len(), 2);
        assert_eq!(compact["dataSample"][0]["name"], "chapter-0.md");
    }

    #[test]
    fn test_failure_omits_empty_fields() {
        let json = ToolResult::failure("Path not found").to_json();
        assert_eq!(json, r#"{"ok":false,"message":"Path not found"}"#);
    }
}
