use bytes::Bytes;
use http::Method;

/// Query keys private to the gateway. These are consumed here and never
/// forwarded to upstream services.
pub const GATEWAY_PARAMS: &[&str] = &["aggregate", "join"];

/// An uploaded file captured from a multipart inbound request, replayed
/// upstream with its original filename and content type.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub name: String,
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Everything the request engine needs from one inbound HTTP request.
///
/// Built by the server shell; owns no connection state. The engine never
/// reads the inbound request again after this is constructed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// LogicModule endpoint name from the URL: `/{service}/...`
    pub service: String,
    /// Model path fragment from the URL: `/../{model}/..`
    pub model: String,
    pub pk: Option<String>,
    /// Inbound query parameters, in order, gateway-private keys included.
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    /// Raw inbound body bytes (forwarded verbatim for JSON requests).
    pub body: Bytes,
    /// Decoded form fields (urlencoded body or multipart text fields).
    pub form: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl RequestContext {
    pub fn new(
        method: Method,
        service: impl Into<String>,
        model: impl Into<String>,
        pk: Option<String>,
    ) -> Self {
        Self {
            method,
            service: service.into(),
            model: model.into(),
            pk,
            query: Vec::new(),
            authorization: None,
            content_type: None,
            body: Bytes::new(),
            form: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Presence of the `join` key enables the join engine.
    pub fn join_enabled(&self) -> bool {
        self.query.iter().any(|(k, _)| k == "join")
    }

    /// Inbound query with the gateway-private keys stripped — the only form
    /// ever forwarded upstream.
    pub fn cleaned_query(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .filter(|(k, _)| !GATEWAY_PARAMS.contains(&k.as_str()))
            .cloned()
            .collect()
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    }

    /// The model's endpoint fragment as registered: `/{model}/`.
    pub fn model_endpoint(&self) -> String {
        format!("/{}/", self.model)
    }
}
