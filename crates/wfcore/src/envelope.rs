//! Wire envelope for cross-process node invocation.
//!
//! The envelope is `{Name, Message, Encoding, Type}` where `Message` is
//! the base64 of a JSON `{request, workflow}` payload. A body without
//! the `BASE64` marker is already decoded JSON and passes through
//! unchanged. The decoded payload describes a one-off single-step
//! workflow executed identically to a document-driven one.

use crate::document::WorkflowDocument;
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ENCODING_BASE64: &str = "BASE64";
pub const TYPE_JSON: &str = "JSON";

/// Outer envelope as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEnvelope {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Encoding")]
    pub encoding: String,
    #[serde(rename = "Type")]
    pub payload_type: String,
}

/// Decoded invocation payload: the request snapshot plus the workflow
/// to run against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInvocation {
    #[serde(default)]
    pub request: Value,
    pub workflow: WorkflowDocument,
}

impl RemoteEnvelope {
    /// Wrap an invocation for a named node into a wire envelope.
    pub fn encode(name: impl Into<String>, invocation: &RemoteInvocation) -> Result<Self, DecodeError> {
        let payload = serde_json::to_vec(invocation)?;
        Ok(Self {
            name: name.into(),
            message: base64::encode(payload),
            encoding: ENCODING_BASE64.to_string(),
            payload_type: TYPE_JSON.to_string(),
        })
    }
}

/// Decode a raw request body into an invocation. The body is either a
/// base64 envelope or an already-decoded `{request, workflow}` object.
pub fn decode(body: &str) -> Result<RemoteInvocation, DecodeError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let is_base64 = parsed.get("Encoding").and_then(Value::as_str) == Some(ENCODING_BASE64)
        && parsed.get("Message").is_some();

    if is_base64 {
        let message = parsed
            .get("Message")
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::Malformed("Message must be a string".to_string()))?;
        let decoded = base64::decode(message)?;
        Ok(serde_json::from_slice(&decoded)?)
    } else {
        Ok(serde_json::from_value(parsed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_invocation() -> RemoteInvocation {
        RemoteInvocation {
            request: serde_json::json!({ "body": { "city": "Berlin" } }),
            workflow: serde_json::from_value(serde_json::json!({
                "name": "one-off",
                "version": "1.0.0",
                "steps": [
                    { "name": "echo", "node": "echo", "type": "module" }
                ],
                "nodes": {}
            }))
            .unwrap(),
        }
    }

    #[test]
    fn base64_envelope_round_trips() {
        let invocation = sample_invocation();
        let envelope = RemoteEnvelope::encode("echo", &invocation).unwrap();
        assert_eq!(envelope.encoding, ENCODING_BASE64);
        assert_eq!(envelope.payload_type, TYPE_JSON);

        let body = serde_json::to_string(&envelope).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.request, invocation.request);
        assert_eq!(decoded.workflow.name, "one-off");
        assert_eq!(decoded.workflow.steps.len(), 1);
    }

    #[test]
    fn plain_json_passes_through() {
        let invocation = sample_invocation();
        let body = serde_json::to_string(&invocation).unwrap();
        let decoded = decode(&body).unwrap();
        assert_eq!(decoded.request, invocation.request);
        assert_eq!(decoded.workflow.steps[0].node, "echo");
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(decode("not json"), Err(DecodeError::Malformed(_))));
        let bad = r#"{ "Message": "%%%", "Encoding": "BASE64", "Name": "x", "Type": "JSON" }"#;
        assert!(matches!(decode(bad), Err(DecodeError::Base64(_))));
    }
}
