use crate::context::{FilePart, RequestContext};
use crate::payload::Payload;
use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tessera_core::{EngineConfig, GatewayError};
use tessera_openapi::ResolvedOperation;

/// A decoded upstream response: body, status, headers.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub payload: Payload,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

/// Body shape of an outbound call, per the inbound content-type rules.
#[derive(Debug, Clone)]
pub enum OutboundBody {
    Empty,
    /// Raw inbound JSON, forwarded verbatim.
    Json(Bytes),
    /// Form-encoded union of cleaned query parameters and form fields.
    Form(Vec<(String, String)>),
    /// Same union plus uploaded files, sent as multipart/form-data.
    Multipart {
        fields: Vec<(String, String)>,
        files: Vec<FilePart>,
    },
}

/// A fully prepared outbound call. Construction encodes the translation
/// rules; `UpstreamClient::send` only performs I/O.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub body: OutboundBody,
}

fn takes_form_body(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

impl OutboundRequest {
    /// The primary call: forwards the cleaned inbound query and, depending on
    /// content type and method, the inbound body.
    pub fn primary(operation: &ResolvedOperation, ctx: &RequestContext) -> Self {
        let query = ctx.cleaned_query();

        let body = if ctx.is_json() {
            OutboundBody::Json(ctx.body.clone())
        } else if takes_form_body(&operation.method) {
            let mut fields = query.clone();
            fields.extend(ctx.form.iter().cloned());
            if ctx.files.is_empty() {
                OutboundBody::Form(fields)
            } else {
                OutboundBody::Multipart {
                    fields,
                    files: ctx.files.clone(),
                }
            }
        } else {
            OutboundBody::Empty
        };

        Self {
            method: operation.method.clone(),
            url: operation.url.clone(),
            query,
            authorization: ctx.authorization.clone(),
            body,
        }
    }

    /// A join sub-request: bare GET, no query, no body. Credentials still
    /// travel with it.
    pub fn related(operation: &ResolvedOperation, ctx: &RequestContext) -> Self {
        Self {
            method: Method::GET,
            url: operation.url.clone(),
            query: Vec::new(),
            authorization: ctx.authorization.clone(),
            body: OutboundBody::Empty,
        }
    }

    /// Cache-eligible: a GET that carries no query parameters.
    pub fn is_cacheable(&self) -> bool {
        self.method == Method::GET && self.query.is_empty()
    }
}

/// HTTP client for upstream services and OpenAPI documents.
///
/// Cloning is cheap and shares the underlying connection pool; all
/// per-request state lives in the caches, not here.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(config: &EngineConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.upstream_timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Fetch and parse an OpenAPI JSON document.
    pub async fn fetch_document(&self, url: &str) -> Result<Value, GatewayError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::SpecFetch {
                url: url.to_string(),
                reason: describe_transport_error(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::SpecFetch {
                url: url.to_string(),
                reason: format!("unexpected status {status}"),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| GatewayError::SpecFetch {
                url: url.to_string(),
                reason: format!("document is not valid JSON: {e}"),
            })
    }

    /// Issue one outbound call and decode the response.
    ///
    /// Non-2xx statuses are data, not errors; only transport failures
    /// (connect, DNS, timeout) surface as `GatewayError::Upstream`.
    pub async fn send(&self, request: &OutboundRequest) -> Result<UpstreamResponse, GatewayError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(authorization) = &request.authorization {
            builder = builder.header(AUTHORIZATION, authorization);
        }

        builder = match &request.body {
            OutboundBody::Empty => builder,
            OutboundBody::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            OutboundBody::Form(fields) => builder.form(fields),
            OutboundBody::Multipart { fields, files } => {
                let mut form = reqwest::multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                for file in files {
                    let part = reqwest::multipart::Part::bytes(file.data.to_vec())
                        .file_name(file.filename.clone())
                        .mime_str(&file.content_type)
                        .map_err(|e| {
                            GatewayError::Upstream(format!(
                                "invalid content type for upload \"{}\": {e}",
                                file.name
                            ))
                        })?;
                    form = form.part(file.name.clone(), part);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&request.url, &e))?;

        Ok(UpstreamResponse {
            payload: Payload::from_bytes(bytes),
            status,
            headers,
        })
    }
}

fn transport_error(url: &str, error: &reqwest::Error) -> GatewayError {
    GatewayError::Upstream(format!(
        "error redirecting the request to or receiving the response from {url} ({}: {error})",
        transport_error_kind(error)
    ))
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    format!("{}: {error}", transport_error_kind(error))
}

fn transport_error_kind(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "timeout"
    } else if error.is_connect() {
        "connect"
    } else if error.is_body() || error.is_decode() {
        "body"
    } else {
        "request"
    }
}
