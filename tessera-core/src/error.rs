use thiserror::Error;

/// Unified error type for the Tessera gateway.
///
/// The primary request path is fail-closed: any of these aborts the inbound
/// request. The join fan-out is fail-open: the same errors are logged and the
/// affected entry is omitted.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Service \"{0}\" not found.")]
    ServiceNotFound(String),

    #[error("Endpoint not found: {0}")]
    EndpointNotFound(String),

    #[error("Failed to load OpenAPI schema from {url}: {reason}")]
    SpecFetch { url: String, reason: String },

    #[error("DataMesh configuration error: {0}")]
    DataMesh(String),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GatewayError {
    /// Map to HTTP status code.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::ServiceNotFound(_) => 404,
            GatewayError::EndpointNotFound(_) => 404,
            GatewayError::SpecFetch { .. } => 502,
            GatewayError::Upstream(_) => 502,
            GatewayError::DataMesh(_) => 500,
            GatewayError::Config(_) => 500,
            GatewayError::Serde(_) => 500,
        }
    }

    /// JSON error body.
    pub fn to_json_body(&self) -> Vec<u8> {
        let body = serde_json::json!({
            "error": self.to_string(),
            "status": self.status_code(),
        });
        serde_json::to_vec(&body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::ServiceNotFound("x".into()).status_code(), 404);
        assert_eq!(GatewayError::EndpointNotFound("GET /x/".into()).status_code(), 404);
        assert_eq!(
            GatewayError::SpecFetch { url: "http://s/schema".into(), reason: "refused".into() }
                .status_code(),
            502
        );
        assert_eq!(GatewayError::Upstream("timeout".into()).status_code(), 502);
        assert_eq!(GatewayError::DataMesh("lookup".into()).status_code(), 500);
        assert_eq!(GatewayError::Config("bad".into()).status_code(), 500);
    }

    #[test]
    fn test_json_body_is_valid_json() {
        let err = GatewayError::ServiceNotFound("crm".into());
        let parsed: serde_json::Value =
            serde_json::from_slice(&err.to_json_body()).expect("to_json_body must produce valid JSON");
        assert_eq!(parsed["status"], 404);
        assert!(parsed["error"].as_str().unwrap().contains("crm"));
    }

    #[test]
    fn test_spec_fetch_names_the_url() {
        let err = GatewayError::SpecFetch {
            url: "http://products.local/schema/".into(),
            reason: "connection refused".into(),
        };
        let text = err.to_string();
        assert!(text.contains("http://products.local/schema/"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            GatewayError::ServiceNotFound("orders".into()).to_string(),
            "Service \"orders\" not found."
        );
        assert_eq!(
            GatewayError::EndpointNotFound("GET /orders/{id}/".into()).to_string(),
            "Endpoint not found: GET /orders/{id}/"
        );
    }
}
