//! Response assertions
//!
//! Every failure message names the request line so that a failed case can
//! be traced back to its endpoint from the report alone.

use serde_json::Value;

use crate::client::{ApiRequest, ApiResponse};
use crate::common::{Error, Result};

use super::suite::Expect;

/// Longest body excerpt quoted in a status mismatch
const EXCERPT_LEN: usize = 200;

/// Check a response against a case's expectations
pub fn check(request: &ApiRequest, response: &ApiResponse, expect: &Expect) -> Result<()> {
    let line = request.line();

    if !expect.status.accepts(response.status) {
        return Err(Error::TestAssertion(format!(
            "{}: expected status {}, got HTTP {} - {}",
            line,
            expect.status,
            response.status,
            excerpt(&response.body)
        )));
    }

    for key in &expect.body_has {
        if response.body.get(key).is_none() {
            return Err(Error::TestAssertion(format!(
                "{}: response body is missing key '{}'",
                line, key
            )));
        }
    }

    for (pointer, expected) in &expect.body_equals {
        let actual = response.body.pointer(pointer);
        if actual != Some(expected) {
            return Err(Error::TestAssertion(format!(
                "{}: expected {} at '{}', got {}",
                line,
                expected,
                pointer,
                actual.map(Value::to_string).unwrap_or_else(|| "nothing".to_string())
            )));
        }
    }

    if let Some(needle) = &expect.body_contains {
        let haystack = response.body.to_string();
        if !haystack.contains(needle.as_str()) {
            return Err(Error::TestAssertion(format!(
                "{}: response body does not contain '{}'",
                line, needle
            )));
        }
    }

    if let Some(limit) = expect.max_response_ms {
        if response.elapsed_ms > limit {
            return Err(Error::TestAssertion(format!(
                "{}: response took {:.1}ms, limit is {:.1}ms",
                line, response.elapsed_ms, limit
            )));
        }
    }

    Ok(())
}

fn excerpt(body: &Value) -> String {
    let text = match body.get("raw_response") {
        Some(Value::String(raw)) => raw.clone(),
        _ => body.to_string(),
    };
    if text.chars().count() > EXCERPT_LEN {
        let cut: String = text.chars().take(EXCERPT_LEN).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
