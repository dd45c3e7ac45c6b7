//! Wire types for the obs-websocket v5 protocol.
//!
//! Every message is an envelope `{ "op": <code>, "d": <payload> }` with
//! camelCase payload fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol opcodes (the `op` field of every envelope).
pub mod opcode {
    pub const HELLO: u8 = 0;
    pub const IDENTIFY: u8 = 1;
    pub const IDENTIFIED: u8 = 2;
    pub const EVENT: u8 = 5;
    pub const REQUEST: u8 = 6;
    pub const REQUEST_RESPONSE: u8 = 7;
    pub const REQUEST_BATCH: u8 = 8;
    pub const REQUEST_BATCH_RESPONSE: u8 = 9;
}

/// Envelope wrapping every protocol message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub op: u8,
    pub d: Value,
}

impl Envelope {
    /// Wrap a payload under the given opcode.
    pub fn new(op: u8, payload: impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            op,
            d: serde_json::to_value(payload)?,
        })
    }
}

/// First message from the server after the socket opens.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub obs_web_socket_version: String,
    pub rpc_version: u32,
    /// Present only when the server requires authentication.
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthChallenge {
    pub challenge: String,
    pub salt: String,
}

/// Client response to `Hello`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    pub rpc_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Bitmask of event categories to receive; this client subscribes to
    /// none.
    pub event_subscriptions: u32,
}

/// Server acknowledgement of a successful `Identify`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identified {
    pub negotiated_rpc_version: u32,
}

/// A single request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub request_type: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Value>,
}

impl Request {
    pub fn new(request_type: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            request_id: request_id.into(),
            request_data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.request_data = Some(data);
        self
    }
}

/// Response to a single request, also the per-entry shape inside a batch
/// response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    pub request_type: String,
    pub request_id: String,
    pub request_status: RequestStatus,
    #[serde(default)]
    pub response_data: Option<Value>,
}

/// Outcome of one request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatus {
    pub result: bool,
    pub code: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A batch of requests executed server-side.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBatch {
    pub request_id: String,
    pub halt_on_failure: bool,
    pub execution_type: i8,
    pub requests: Vec<Request>,
}

/// Responses for a batch, in request order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBatchResponse {
    pub request_id: String,
    pub results: Vec<RequestResponse>,
}

/// RequestBatchExecutionType.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionType {
    /// Executed between render frames, one at a time.
    SerialRealtime,
    /// Executed on the render thread, one per rendered frame.
    SerialFrame,
    /// Executed concurrently.
    Parallel,
}

impl ExecutionType {
    pub fn code(self) -> i8 {
        match self {
            ExecutionType::SerialRealtime => 0,
            ExecutionType::SerialFrame => 1,
            ExecutionType::Parallel => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identify_serializes_camel_case_and_skips_missing_auth() {
        let envelope = Envelope::new(
            opcode::IDENTIFY,
            Identify {
                rpc_version: 1,
                authentication: None,
                event_subscriptions: 0,
            },
        )
        .unwrap();
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["op"], 1);
        assert_eq!(value["d"]["rpcVersion"], 1);
        assert_eq!(value["d"]["eventSubscriptions"], 0);
        assert!(value["d"].get("authentication").is_none());
    }

    #[test]
    fn hello_with_challenge_parses() {
        let hello: Hello = serde_json::from_value(json!({
            "obsWebSocketVersion": "5.3.3",
            "rpcVersion": 1,
            "authentication": {
                "challenge": "abc",
                "salt": "def"
            }
        }))
        .unwrap();
        assert_eq!(hello.obs_web_socket_version, "5.3.3");
        let auth = hello.authentication.unwrap();
        assert_eq!(auth.challenge, "abc");
        assert_eq!(auth.salt, "def");
    }

    #[test]
    fn request_response_parses_failure_status() {
        let response: RequestResponse = serde_json::from_value(json!({
            "requestType": "GetSourceScreenshot",
            "requestId": "Static 1",
            "requestStatus": {
                "result": false,
                "code": 600,
                "comment": "No source was found"
            }
        }))
        .unwrap();
        assert!(!response.request_status.result);
        assert_eq!(response.request_status.code, 600);
        assert!(response.response_data.is_none());
    }
}
