//! Dual-format tool-call parser for LLM responses.
//!
//! Supports two formats that the LLM may use to express a tool call:
//!
//! # Format 1 — OpenAI JSON
//! The response content is a JSON object containing a `tool_calls` array:
//!
//! ```json
//! {
//!   "tool_calls": [
//!     { "id": "call_abc", "type": "function",
//!       "function": { "name": "file_read", "arguments": "{\"path\": \"x.txt\"}" } }
//!   ]
//! }
//! ```
//!
//! # Format 2 — XML inline
//! The response is free-form text containing one or more `<tool_call>` tags:
//!
//! ```xml
//! I'll read the file now.
//! <tool_call>{"name": "file_read", "arguments": {"path": "x.txt"}}</tool_call>
//! ```
//!
//! Both formats may carry an optional `tool_description` alongside `name`/
//! `arguments`; it is extracted separately and never leaks into the
//! arguments object handed to a tool handler.

use serde_json::Value;

/// A tool invocation extracted from an LLM response.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    pub name: String,
    pub arguments: Value,
    /// Present in OpenAI JSON format; synthesized by the caller otherwise.
    pub call_id: Option<String>,
    pub tool_description: Option<String>,
}

/// Parse all tool calls from an LLM response string.
///
/// Tries the JSON format first; if the content is not a valid JSON object
/// with `tool_calls`, falls back to scanning for XML `<tool_call>` tags.
/// Returns an empty `Vec` when no tool calls are found.
pub fn parse_tool_calls(content: &str) -> Vec<ParsedToolCall> {
    if let Some(calls) = try_parse_json(content) {
        if !calls.is_empty() {
            return calls;
        }
    }
    parse_xml(content)
}

fn try_parse_json(content: &str) -> Option<Vec<ParsedToolCall>> {
    let trimmed = content.trim();
    let obj: Value = serde_json::from_str(trimmed).ok()?;
    let tool_calls = obj.get("tool_calls")?.as_array()?;

    let mut result = Vec::new();
    for entry in tool_calls {
        let func = entry.get("function")?;
        let name = func.get("name")?.as_str()?.to_string();
        let call_id = entry.get("id").and_then(|v| v.as_str()).map(str::to_string);
        let tool_description = func
            .get("tool_description")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut arguments = match func.get("arguments") {
            Some(Value::String(s)) => serde_json::from_str(s).unwrap_or(Value::Object(Default::default())),
            Some(v) => v.clone(),
            None => Value::Object(Default::default()),
        };
        strip_tool_description(&mut arguments);

        result.push(ParsedToolCall {
            name,
            arguments,
            call_id,
            tool_description,
        });
    }
    Some(result)
}

fn parse_xml(content: &str) -> Vec<ParsedToolCall> {
    const OPEN: &str = "<tool_call>";
    const CLOSE: &str = "</tool_call>";

    let mut result = Vec::new();
    let mut remaining = content;

    while let Some(start) = remaining.find(OPEN) {
        remaining = &remaining[start + OPEN.len()..];
        let end = match remaining.find(CLOSE) {
            Some(i) => i,
            None => break,
        };
        let body = remaining[..end].trim();
        remaining = &remaining[end + CLOSE.len()..];

        if let Some(call) = parse_xml_body(body) {
            result.push(call);
        }
    }
    result
}

fn parse_xml_body(body: &str) -> Option<ParsedToolCall> {
    let obj: Value = serde_json::from_str(body).ok()?;
    let name = obj.get("name")?.as_str()?.to_string();
    let tool_description = obj.get("tool_description").and_then(Value::as_str).map(str::to_string);
    let mut arguments = obj.get("arguments").cloned().unwrap_or(Value::Object(Default::default()));
    strip_tool_description(&mut arguments);

    Some(ParsedToolCall {
        name,
        arguments,
        call_id: None,
        tool_description,
    })
}

fn strip_tool_description(arguments: &mut Value) {
    if let Some(obj) = arguments.as_object_mut() {
        obj.remove("tool_description");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_single_tool_call() {
        let content = r#"Let me check that.
<tool_call>{"name": "file_read", "arguments": {"path": "a.txt"}}</tool_call>
Done."#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "file_read");
        assert_eq!(calls[0].arguments["path"], "a.txt");
        assert!(calls[0].call_id.is_none());
    }

    #[test]
    fn xml_extracts_tool_description_separately() {
        let content = r#"<tool_call>{"name": "file_write", "tool_description": "saving the draft", "arguments": {"path": "a.txt", "content": "x"}}</tool_call>"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls[0].tool_description.as_deref(), Some("saving the draft"));
        assert!(calls[0].arguments.get("tool_description").is_none());
    }

    #[test]
    fn xml_multiple_tool_calls() {
        let content = r#"<tool_call>{"name": "file_read", "arguments": {"path": "/a"}}</tool_call>
<tool_call>{"name": "file_read", "arguments": {"path": "/b"}}</tool_call>"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].arguments["path"], "/a");
        assert_eq!(calls[1].arguments["path"], "/b");
    }

    #[test]
    fn xml_no_tool_calls() {
        assert!(parse_tool_calls("The answer is 42.").is_empty());
    }

    #[test]
    fn xml_malformed_json_skipped() {
        let content = r#"<tool_call>not json</tool_call>
<tool_call>{"name": "valid_tool", "arguments": {}}</tool_call>"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "valid_tool");
    }

    #[test]
    fn xml_unclosed_tag_stops_parsing() {
        let content = r#"<tool_call>{"name": "orphan""#;
        assert!(parse_tool_calls(content).is_empty());
    }

    #[test]
    fn json_single_tool_call() {
        let content = r#"{
  "tool_calls": [
    { "id": "call_xyz", "type": "function",
      "function": { "name": "file_read", "arguments": "{\"path\": \"a.txt\"}" } }
  ]
}"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "file_read");
        assert_eq!(calls[0].arguments["path"], "a.txt");
        assert_eq!(calls[0].call_id.as_deref(), Some("call_xyz"));
    }

    #[test]
    fn json_arguments_as_object_not_string() {
        let content = r#"{"tool_calls": [
            {"type": "function",
             "function": {"name": "my_tool", "arguments": {"key": "value"}}}
        ]}"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls[0].arguments["key"], "value");
    }

    #[test]
    fn json_empty_tool_calls_falls_back_to_xml_scan() {
        let content = r#"{"tool_calls": []}
<tool_call>{"name": "fallback", "arguments": {}}</tool_call>"#;
        let calls = parse_tool_calls(content);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "fallback");
    }

    #[test]
    fn plain_text_returns_empty() {
        assert!(parse_tool_calls("I don't need any tools.").is_empty());
    }
}
