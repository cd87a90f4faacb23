//! The pipe-delimited result protocol.
//!
//! A well-formed line is `STATUS|CHECK_NAME|MESSAGE|COMMAND`. The protocol
//! has no escaping mechanism: a `|` inside MESSAGE shifts the remaining
//! fields, and a `|` inside COMMAND is absorbed because the split stops at
//! four fields. This matches the shell `IFS='|' read -r` behavior probes
//! were written against and is preserved deliberately.

use crate::error::ParseError;
use crate::status::CheckStatus;
use serde::{Deserialize, Serialize};

/// One structured verdict emitted by a probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckResult {
    /// Verdict token.
    pub status: CheckStatus,

    /// Identifier used for grouping and display. Not unique within a run;
    /// one probe commonly emits several lines under the same name.
    pub check_name: String,

    /// Human-readable description of what was found.
    pub message: String,

    /// Literal command a human could run to reproduce the finding.
    /// Documentation aid only, never executed by the orchestrator.
    pub command: String,
}

impl CheckResult {
    pub fn new(
        status: CheckStatus,
        check_name: impl Into<String>,
        message: impl Into<String>,
        command: impl Into<String>,
    ) -> Self {
        Self {
            status,
            check_name: check_name.into(),
            message: message.into(),
            command: command.into(),
        }
    }

    /// Serialize back to the wire format.
    ///
    /// For any line accepted by [`parse_line`] this reproduces the input
    /// byte-for-byte (round-trip law), including the lossy case where the
    /// original COMMAND field contained pipes.
    pub fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.status, self.check_name, self.message, self.command
        )
    }
}

/// Whether a raw stdout line looks like an attempted result line.
///
/// Used by callers to decide between the malformed-output tally (pipes
/// present, so the probe tried and failed to speak the protocol) and
/// ordinary diagnostic noise (no pipes, shown only in verbose mode).
pub fn looks_like_result_line(line: &str) -> bool {
    line.contains('|')
}

/// Parse one raw stdout line into a [`CheckResult`].
///
/// Total over arbitrary byte input: non-UTF8, empty, short, or
/// unrecognized lines come back as [`ParseError`], never a panic.
pub fn parse_line(line: &[u8]) -> Result<CheckResult, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidUtf8)?;
    let line = line.trim_end_matches(['\r', '\n']);

    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    // splitn keeps any extra pipes inside the fourth field, matching the
    // shell `read -r status name message command` the protocol grew out of.
    let fields: Vec<&str> = line.splitn(4, '|').collect();

    let status: CheckStatus = fields[0]
        .parse()
        .map_err(|()| ParseError::UnknownStatus {
            token: fields[0].to_string(),
        })?;

    if fields.len() < 4 {
        return Err(ParseError::MissingFields {
            found: fields.len(),
        });
    }

    if fields[1].is_empty() {
        return Err(ParseError::EmptyCheckName);
    }

    Ok(CheckResult {
        status,
        check_name: fields[1].to_string(),
        message: fields[2].to_string(),
        command: fields[3].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::Bucket;

    #[test]
    fn test_parse_valid_line() {
        let result = parse_line(b"PASS|redis_auth|Password accepted|redis-cli -a $REDIS_PASSWORD ping")
            .expect("parse failed");
        assert_eq!(result.status, CheckStatus::Pass);
        assert_eq!(result.check_name, "redis_auth");
        assert_eq!(result.message, "Password accepted");
        assert_eq!(result.command, "redis-cli -a $REDIS_PASSWORD ping");
    }

    #[test]
    fn test_parse_info_line_lands_informational() {
        let result = parse_line(b"INFO|redis_storage|Keys: 42, Documents: 15|docker exec kv redis-cli keys '*'")
            .expect("parse failed");
        assert_eq!(result.status, CheckStatus::Info);
        assert_eq!(result.status.bucket(), Bucket::Informational);
    }

    #[test]
    fn test_round_trip_law() {
        let lines = [
            "ENABLED|tls_cert|Certificate valid until 2027|openssl x509 -enddate",
            "BROKEN|redis_auth|Redis container not found|docker compose ps kv",
            "FAIL|qdrant_api||curl -s localhost:6333",
            "DISABLED|memgraph_auth||",
        ];
        for line in lines {
            let parsed = parse_line(line.as_bytes()).expect("parse failed");
            assert_eq!(parsed.to_line(), line);
        }
    }

    #[test]
    fn test_extra_pipes_absorbed_by_command() {
        // Known lossy edge: pipes past the third delimiter stay in COMMAND.
        let parsed = parse_line(b"PASS|x|ok|redis-cli ping | grep PONG").expect("parse failed");
        assert_eq!(parsed.command, "redis-cli ping | grep PONG");
        assert_eq!(parsed.to_line(), "PASS|x|ok|redis-cli ping | grep PONG");
    }

    #[test]
    fn test_too_few_fields() {
        assert_eq!(
            parse_line(b"PASS|only_name"),
            Err(ParseError::MissingFields { found: 2 })
        );
        assert_eq!(
            parse_line(b"BROKEN|a|b"),
            Err(ParseError::MissingFields { found: 3 })
        );
    }

    #[test]
    fn test_unknown_status_token() {
        assert_eq!(
            parse_line(b"WARN|x|y|z"),
            Err(ParseError::UnknownStatus {
                token: "WARN".to_string()
            })
        );
        // Plain chatter parses as a one-field line with an unknown token.
        assert!(matches!(
            parse_line(b"Checking redis connectivity..."),
            Err(ParseError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn test_empty_and_binary_input() {
        assert_eq!(parse_line(b""), Err(ParseError::Empty));
        assert_eq!(parse_line(b"\n"), Err(ParseError::Empty));
        assert_eq!(parse_line(&[0xff, 0xfe, 0x00]), Err(ParseError::InvalidUtf8));
    }

    #[test]
    fn test_empty_check_name_rejected() {
        assert_eq!(parse_line(b"PASS||msg|cmd"), Err(ParseError::EmptyCheckName));
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let parsed = parse_line(b"PASS|x|ok|cmd\n").expect("parse failed");
        assert_eq!(parsed.command, "cmd");
    }

    #[test]
    fn test_looks_like_result_line() {
        assert!(looks_like_result_line("WARN|x|y|z"));
        assert!(!looks_like_result_line("Checking redis..."));
    }
}
