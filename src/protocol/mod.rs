//! Worker → orchestrator wire protocol
//!
//! A closed set of tagged messages serialized as one JSON document per
//! line over the worker's stdout pipe. No message flows in the other
//! direction after spawn; all per-worker configuration travels as
//! process-start parameters.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::models::{CaseReport, TestCaseRef};

/// Every message kind that can cross the worker channel.
///
/// `run_complete` is emitted by the orchestrator only, once, at
/// finalization; workers never send it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    #[serde(rename_all = "camelCase")]
    RunStart {
        num_files: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_child_count: Option<usize>,
    },
    TestStart(TestCaseRef),
    TestResult(CaseReport),
    TestError {
        error: String,
    },
    RunComplete,
}

/// Serialize a message to its single-line wire form (no trailing newline).
pub fn encode_line(message: &Message) -> Result<String> {
    serde_json::to_string(message).context("failed to serialize protocol message")
}

/// Parse one line of worker output into a message.
pub fn decode_line(line: &str) -> Result<Message> {
    serde_json::from_str(line.trim()).context("failed to parse protocol message")
}

/// Destination for a worker's outbound messages.
///
/// Production workers write JSON lines to stdout; tests collect into a Vec.
pub trait MessageSink {
    fn emit(&mut self, message: &Message) -> Result<()>;
}

/// Sink writing the wire form to this process's stdout, flushed per
/// message so the orchestrator sees events as they happen.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        use std::io::Write;

        let line = encode_line(message)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}").context("failed to write protocol message")?;
        out.flush().context("failed to flush protocol message")
    }
}

/// Sink collecting messages in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub messages: Vec<Message>,
}

impl MessageSink for VecSink {
    fn emit(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SerializedError;

    #[test]
    fn run_start_wire_shape() {
        let msg = Message::RunStart {
            num_files: 2,
            max_child_count: Some(4),
        };
        let json: serde_json::Value = serde_json::from_str(&encode_line(&msg).unwrap()).unwrap();

        assert_eq!(json["kind"], "run_start");
        assert_eq!(json["numFiles"], 2);
        assert_eq!(json["maxChildCount"], 4);
    }

    #[test]
    fn run_start_omits_absent_max_child_count() {
        let msg = Message::RunStart {
            num_files: 3,
            max_child_count: None,
        };
        assert!(!encode_line(&msg).unwrap().contains("maxChildCount"));
    }

    #[test]
    fn test_result_wire_shape() {
        let msg = Message::TestResult(CaseReport::failed(
            TestCaseRef {
                title: "fails".to_string(),
                file_name: "selftest/failing.tp".to_string(),
                index: 1,
            },
            SerializedError {
                name: "Error".to_string(),
                message: "expected 2, got 3".to_string(),
                stack: None,
                code: None,
            },
            7,
        ));

        let line = encode_line(&msg).unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["kind"], "test_result");
        assert_eq!(json["testCase"]["title"], "fails");
        assert_eq!(json["error"]["message"], "expected 2, got 3");

        assert_eq!(decode_line(&line).unwrap(), msg);
    }

    #[test]
    fn run_complete_is_bare_tag() {
        let line = encode_line(&Message::RunComplete).unwrap();
        assert_eq!(line, r#"{"kind":"run_complete"}"#);
        assert_eq!(decode_line(&line).unwrap(), Message::RunComplete);
    }

    #[test]
    fn decode_rejects_non_protocol_output() {
        assert!(decode_line("some stray println from a test").is_err());
        assert!(decode_line(r#"{"kind":"unknown_kind"}"#).is_err());
    }

    #[test]
    fn vec_sink_preserves_order() {
        let mut sink = VecSink::default();
        sink.emit(&Message::TestError {
            error: "no tests found".to_string(),
        })
        .unwrap();
        sink.emit(&Message::RunComplete).unwrap();

        assert_eq!(sink.messages.len(), 2);
        assert_eq!(sink.messages[1], Message::RunComplete);
    }
}
