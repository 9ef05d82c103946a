//! Per-case result models
//!
//! Defines the identity, error, and report types produced by the case
//! runner and carried over the wire protocol.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one declared test case within a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseRef {
    pub title: String,
    pub file_name: String,
    pub index: usize,
}

impl fmt::Display for TestCaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.file_name)
    }
}

/// An error flattened for the process boundary.
///
/// Native error values cannot cross the worker channel as-is; only the
/// fields below survive serialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedError {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl SerializedError {
    /// Flatten an error chain into the wire shape.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let code = err
            .downcast_ref::<std::io::Error>()
            .and_then(|e| e.raw_os_error())
            .map(|c| c.to_string());

        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        let stack = if causes.is_empty() {
            None
        } else {
            Some(causes.join("\n"))
        };

        Self {
            name: "Error".to_string(),
            message: err.to_string(),
            stack,
            code,
        }
    }

    /// Convert a caught panic payload into the wire shape.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());

        Self {
            name: "panic".to_string(),
            message,
            stack: None,
            code: None,
        }
    }
}

impl fmt::Display for SerializedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Result of running a single test case.
///
/// Immutable once produced; forwarded verbatim as a protocol message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub test_case: TestCaseRef,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SerializedError>,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
}

impl CaseReport {
    pub fn passed(test_case: TestCaseRef, duration_ms: u64) -> Self {
        Self {
            test_case,
            passed: true,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(test_case: TestCaseRef, error: SerializedError, duration_ms: u64) -> Self {
        Self {
            test_case,
            passed: false,
            error: Some(error),
            duration_ms,
        }
    }
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "✓" } else { "✗" };
        write!(f, "{} {} [{}ms]", status, self.test_case, self.duration_ms)?;
        if let Some(err) = &self.error {
            write!(f, " - {err}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_ref() -> TestCaseRef {
        TestCaseRef {
            title: "adds integers".to_string(),
            file_name: "selftest/arith.tp".to_string(),
            index: 0,
        }
    }

    #[test]
    fn serialized_error_keeps_chain_as_stack() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing artifact");
        let err = anyhow::Error::new(io).context("loading file");
        let serialized = SerializedError::from_error(&err);

        assert_eq!(serialized.message, "loading file");
        assert_eq!(serialized.stack.as_deref(), Some("missing artifact"));
    }

    #[test]
    fn serialized_error_from_panic_payload() {
        let serialized = SerializedError::from_panic(Box::new("boom"));
        assert_eq!(serialized.name, "panic");
        assert_eq!(serialized.message, "boom");

        let serialized = SerializedError::from_panic(Box::new(42_u32));
        assert_eq!(serialized.message, "panic with non-string payload");
    }

    #[test]
    fn report_round_trips_with_wire_field_names() {
        let report = CaseReport::failed(
            case_ref(),
            SerializedError {
                name: "Error".to_string(),
                message: "assertion failed".to_string(),
                stack: None,
                code: None,
            },
            12,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["testCase"]["fileName"], "selftest/arith.tp");
        assert_eq!(json["duration"], 12);
        assert_eq!(json["passed"], false);

        let back: CaseReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn passing_report_omits_error() {
        let json = serde_json::to_string(&CaseReport::passed(case_ref(), 3)).unwrap();
        assert!(!json.contains("error"));
    }
}
