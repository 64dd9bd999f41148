use crate::cache::{ResponseCache, SpecCache};
use crate::client::{OutboundRequest, UpstreamClient, UpstreamResponse};
use crate::context::RequestContext;
use crate::executor;
use crate::payload::Payload;
use crate::planner;
use http::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tessera_core::{ExecutionMode, GatewayError};
use tessera_registry::Registry;
use tracing::{debug, error};

/// Headers never copied from the primary upstream response to the caller:
/// hop-by-hop headers plus the framing headers that stop being true once the
/// join engine has grown the body.
const DROPPED_RESPONSE_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "content-length",
    "content-type",
];

/// The engine's output for one inbound request.
///
/// Status and headers are always the primary upstream's; join sub-requests
/// contribute body content only.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub payload: Payload,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

impl GatewayResponse {
    /// Body bytes plus the content type to declare: `application/json` for
    /// structured payloads, the upstream's own content type for raw ones.
    pub fn body(&self) -> Result<(bytes::Bytes, Option<String>), GatewayError> {
        let bytes = self.payload.to_body()?;
        let content_type = match self.payload.content_type() {
            Some(ct) => Some(ct.to_string()),
            None => self
                .headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
                .map(|(_, value)| value.clone()),
        };
        Ok((bytes, content_type))
    }

    /// Upstream headers safe to surface to the caller.
    pub fn forwarded_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(name, _)| {
                !DROPPED_RESPONSE_HEADERS
                    .iter()
                    .any(|dropped| name.eq_ignore_ascii_case(dropped))
            })
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

/// One inbound gateway request in flight.
///
/// Owns the per-request caches; created at request entry and dropped at
/// request exit, so nothing here outlives or is shared across inbound
/// requests. The reqwest client and the registry are the only shared
/// collaborators, and both are stateless from the engine's point of view.
pub struct GatewayRequest {
    registry: Arc<dyn Registry>,
    client: UpstreamClient,
    specs: SpecCache,
    responses: ResponseCache,
    mode: ExecutionMode,
}

impl GatewayRequest {
    pub fn new(registry: Arc<dyn Registry>, client: UpstreamClient, mode: ExecutionMode) -> Self {
        Self {
            registry,
            client,
            specs: SpecCache::new(),
            responses: ResponseCache::new(),
            mode,
        }
    }

    pub(crate) fn registry(&self) -> &dyn Registry {
        self.registry.as_ref()
    }

    pub(crate) fn client(&self) -> &UpstreamClient {
        &self.client
    }

    pub(crate) fn specs(&self) -> &SpecCache {
        &self.specs
    }

    pub(crate) fn responses(&self) -> &ResponseCache {
        &self.responses
    }

    pub(crate) fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Drive one inbound request end to end: resolve the operation against
    /// the service's OpenAPI document, perform the primary call, run the join
    /// engine when requested, and hand back the composite response.
    ///
    /// The primary path is fail-closed: any error here aborts the request.
    /// Join sub-requests are fail-open and can only ever add body content.
    pub async fn perform(&self, ctx: &RequestContext) -> Result<GatewayResponse, GatewayError> {
        let module = self.registry.logic_module(&ctx.service).await?;
        let spec = self.specs.get_or_fetch(&self.client, &module).await?;
        let operation = spec.resolve(&ctx.method, &ctx.model, ctx.pk.as_deref())?;
        debug!(method = %operation.method, url = %operation.url, "Resolved primary operation");

        let request = OutboundRequest::primary(&operation, ctx);
        let UpstreamResponse {
            mut payload,
            status,
            headers,
        } = self.responses.get_or_send(&self.client, &request).await?;

        if self.join_applies(ctx, status, &payload) {
            if let Payload::Json(value) = &mut payload {
                self.join(ctx, value).await?;
            }
        }

        Ok(GatewayResponse {
            payload,
            status,
            headers,
        })
    }

    /// Joins run for read requests only, on a successful structured primary
    /// response, when the inbound query carries the `join` flag.
    fn join_applies(&self, ctx: &RequestContext, status: StatusCode, payload: &Payload) -> bool {
        ctx.join_enabled()
            && ctx.method == Method::GET
            && status == StatusCode::OK
            && payload.is_joinable()
    }

    async fn join(&self, ctx: &RequestContext, payload: &mut Value) -> Result<(), GatewayError> {
        let primary_model = self
            .registry
            .model(&ctx.service, &ctx.model_endpoint())
            .await?;

        let plan = planner::plan_joins(payload, &primary_model, self.registry.as_ref()).await?;
        if plan.is_empty() {
            return Ok(());
        }
        debug!(sub_requests = plan.len(), mode = ?self.mode, "Executing join plan");

        let results = executor::execute(self, ctx, &plan).await;
        let fetched = results.iter().filter(|r| r.is_some()).count();
        if fetched < plan.len() {
            error!(
                planned = plan.len(),
                fetched,
                "Join completed with missing entries"
            );
        }
        executor::apply_results(payload, &plan, results);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde_json::json;

    fn response(payload: Payload) -> GatewayResponse {
        GatewayResponse {
            payload,
            status: StatusCode::OK,
            headers: vec![
                ("content-type".into(), "text/plain".into()),
                ("content-length".into(), "4".into()),
                ("x-request-id".into(), "abc".into()),
                ("Transfer-Encoding".into(), "chunked".into()),
            ],
        }
    }

    #[test]
    fn test_json_body_declares_json_content_type() {
        let resp = response(Payload::Json(json!({"id": 1})));
        let (bytes, content_type) = resp.body().unwrap();
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(&bytes[..], b"{\"id\":1}");
    }

    #[test]
    fn test_raw_body_keeps_upstream_content_type() {
        let resp = response(Payload::Raw(Bytes::from_static(b"pong")));
        let (bytes, content_type) = resp.body().unwrap();
        assert_eq!(content_type.as_deref(), Some("text/plain"));
        assert_eq!(&bytes[..], b"pong");
    }

    #[test]
    fn test_forwarded_headers_drop_framing_and_hop_by_hop() {
        let resp = response(Payload::Json(json!({})));
        let forwarded: Vec<_> = resp.forwarded_headers().collect();
        assert_eq!(forwarded, vec![("x-request-id", "abc")]);
    }
}
