use bytes::Bytes;
use serde_json::Value;
use tessera_core::GatewayError;

/// An upstream response body.
///
/// Upstream payloads are schema-less at this layer: anything that parses as
/// JSON is kept structured (and is a join candidate when it is an object or
/// array); everything else passes through as raw bytes.
#[derive(Debug, Clone)]
pub enum Payload {
    Json(Value),
    Raw(Bytes),
}

impl Payload {
    /// Decode a response body: JSON first, raw bytes on failure.
    pub fn from_bytes(bytes: Bytes) -> Self {
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => Payload::Json(value),
            Err(_) => Payload::Raw(bytes),
        }
    }

    /// Only JSON objects and arrays participate in joining.
    pub fn is_joinable(&self) -> bool {
        matches!(
            self,
            Payload::Json(Value::Object(_)) | Payload::Json(Value::Array(_))
        )
    }

    /// Serialize back to body bytes. JSON payloads are re-encoded (the join
    /// engine may have grown them); raw payloads pass through untouched.
    pub fn to_body(&self) -> Result<Bytes, GatewayError> {
        match self {
            Payload::Json(value) => Ok(Bytes::from(serde_json::to_vec(value)?)),
            Payload::Raw(bytes) => Ok(bytes.clone()),
        }
    }

    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            Payload::Json(_) => Some("application/json"),
            Payload::Raw(_) => None,
        }
    }
}
