use std::fmt;

use serde_json::Value;

/// Structured error information extracted from an Elasticsearch error body.
///
/// Elasticsearch answers failed requests with
/// `{"error": {"type": ..., "reason": ..., "root_cause": [...]}, "status": N}`.
/// Very old versions and proxies answer with a plain string instead.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ErrorInfo {
    pub(crate) error_type: Option<String>,
    pub(crate) reason: Option<String>,
    pub(crate) root_cause: Option<String>,
}

impl ErrorInfo {
    /// Build error info from a raw response body.
    ///
    /// Bodies that are not JSON are kept verbatim as the reason.
    pub fn from_body(body: &str) -> Self {
        let value: Value = match serde_json::from_str(body) {
            Ok(v) => v,
            Err(_) => {
                let trimmed = body.trim();
                return Self {
                    reason: (!trimmed.is_empty()).then(|| trimmed.to_string()),
                    ..Self::default()
                };
            }
        };

        match value.get("error") {
            Some(Value::String(msg)) => Self {
                reason: Some(msg.clone()),
                ..Self::default()
            },
            Some(err @ Value::Object(_)) => Self {
                error_type: string_field(err, "type"),
                reason: string_field(err, "reason"),
                root_cause: err
                    .get("root_cause")
                    .and_then(|rc| rc.get(0))
                    .and_then(|first| string_field(first, "reason")),
            },
            _ => Self {
                reason: Some(value.to_string()),
                ..Self::default()
            },
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error_type, &self.reason) {
            (Some(t), Some(r)) => write!(f, "{t}: {r}")?,
            (Some(t), None) => write!(f, "{t}")?,
            (None, Some(r)) => write!(f, "{r}")?,
            (None, None) => write!(f, "no error details")?,
        }
        if let Some(cause) = &self.root_cause {
            if Some(cause) != self.reason.as_ref() {
                write!(f, " (caused by: {cause})")?;
            }
        }
        Ok(())
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_error_body() {
        let body = r#"{"error":{"root_cause":[{"type":"parsing_exception","reason":"unknown query [mach_all]"}],"type":"parsing_exception","reason":"unknown query [mach_all]"},"status":400}"#;
        let info = ErrorInfo::from_body(body);
        assert_eq!(info.error_type.as_deref(), Some("parsing_exception"));
        assert_eq!(info.to_string(), "parsing_exception: unknown query [mach_all]");
    }

    #[test]
    fn test_root_cause_differs() {
        let body = r#"{"error":{"root_cause":[{"type":"x","reason":"shard failed"}],"type":"search_phase_execution_exception","reason":"all shards failed"},"status":500}"#;
        let info = ErrorInfo::from_body(body);
        assert_eq!(
            info.to_string(),
            "search_phase_execution_exception: all shards failed (caused by: shard failed)"
        );
    }

    #[test]
    fn test_plain_text_body() {
        let info = ErrorInfo::from_body("Bad Gateway\n");
        assert_eq!(info.reason.as_deref(), Some("Bad Gateway"));
        assert_eq!(info.error_type, None);
        assert_eq!(info.to_string(), "Bad Gateway");
    }

    #[test]
    fn test_string_error_field() {
        let info = ErrorInfo::from_body(r#"{"error":"IndexMissingException[[foo] missing]","status":404}"#);
        assert_eq!(info.to_string(), "IndexMissingException[[foo] missing]");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(ErrorInfo::from_body("").to_string(), "no error details");
    }
}
