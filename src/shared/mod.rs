//! Shared helpers: the response envelope and small formatters.
//!
//! Every tool returns one of two envelopes, serialized as pretty JSON in a
//! single text content block:
//!   success: {"status": "success", "data": ...}
//!   failure: {"status": "error", "message": "..."}
//! Ambiguous lookups are not failures; they come back as a success whose
//! data carries a `matches` array of disambiguation stubs.

use rmcp::{model::*, ErrorData as McpError};
use serde_json::{json, Value};

pub mod resolve;

use resolve::MatchStub;

fn envelope(body: Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

pub fn success(data: Value) -> Result<CallToolResult, McpError> {
    envelope(json!({"status": "success", "data": data}))
}

pub fn failure(message: impl Into<String>) -> Result<CallToolResult, McpError> {
    envelope(json!({"status": "error", "message": message.into()}))
}

/// Multiple candidates and no exact match: hand back every candidate's
/// stub instead of acting on a guess.
pub fn disambiguation(
    message: impl Into<String>,
    matches: &[MatchStub],
) -> Result<CallToolResult, McpError> {
    success(json!({"message": message.into(), "matches": matches}))
}

/// Format a millisecond duration as "2h 51m" / "2m 5s" / "42s".
pub fn format_duration_ms(ms: i64) -> String {
    let seconds = ms / 1000;
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        let mins = seconds / 60;
        let secs = seconds % 60;
        if secs == 0 {
            format!("{}m", mins)
        } else {
            format!("{}m {}s", mins, secs)
        }
    } else {
        let hours = seconds / 3600;
        let mins = (seconds % 3600) / 60;
        if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

/// Format bytes to human readable string
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(result: CallToolResult) -> Value {
        let content = result.content.first().expect("one content block");
        let text = content.as_text().expect("text content");
        serde_json::from_str(&text.text).expect("valid json")
    }

    #[test]
    fn test_success_envelope_shape() {
        let result = success(json!({"count": 3})).unwrap();
        let body = payload(result);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["count"], 3);
    }

    #[test]
    fn test_failure_envelope_shape() {
        let result = failure("Library 'Anime' not found").unwrap();
        let body = payload(result);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Library 'Anime' not found");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn test_disambiguation_carries_all_stubs() {
        let stubs = vec![
            MatchStub {
                title: "Dune".into(),
                id: "1".into(),
                kind: "movie".into(),
                year: Some(1984),
            },
            MatchStub {
                title: "Dune".into(),
                id: "2".into(),
                kind: "movie".into(),
                year: Some(2021),
            },
        ];
        let result = disambiguation("Multiple items matched 'Dune'", &stubs).unwrap();
        let body = payload(result);
        assert_eq!(body["status"], "success");
        let matches = body["data"]["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0]["type"], "movie");
        assert_eq!(matches[1]["year"], 2021);
    }

    #[test]
    fn test_format_duration_ms() {
        assert_eq!(format_duration_ms(42_000), "42s");
        assert_eq!(format_duration_ms(125_000), "2m 5s");
        assert_eq!(format_duration_ms(10_260_000), "2h 51m");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
