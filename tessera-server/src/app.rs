use crate::extract;
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::response::Response;
use axum::routing::any;
use axum::Router;
use http::header::CONTENT_TYPE;
use http::{HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use tessera_core::{GatewayError, TesseraConfig};
use tessera_gateway::{GatewayRequest, GatewayResponse, UpstreamClient};
use tessera_registry::Registry;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared state for the gateway shell.
///
/// The registry and the HTTP client outlive requests; everything else (the
/// spec and response caches) is created per request inside `GatewayRequest`.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub client: UpstreamClient,
    pub config: Arc<TesseraConfig>,
}

/// Build the axum router for the gateway URL shape.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{service}/{model}/", any(collection_handler))
        .route("/{service}/{model}/{pk}/", any(detail_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn collection_handler(
    State(state): State<AppState>,
    Path((service, model)): Path<(String, String)>,
    request: Request,
) -> Response {
    handle(state, service, model, None, request).await
}

async fn detail_handler(
    State(state): State<AppState>,
    Path((service, model, pk)): Path<(String, String, String)>,
    request: Request,
) -> Response {
    handle(state, service, model, Some(pk), request).await
}

async fn handle(
    state: AppState,
    service: String,
    model: String,
    pk: Option<String>,
    request: Request,
) -> Response {
    let ctx = match extract::request_context(
        service,
        model,
        pk,
        request,
        state.config.server.max_body_bytes,
    )
    .await
    {
        Ok(ctx) => ctx,
        Err(response) => return response,
    };

    let engine = GatewayRequest::new(
        Arc::clone(&state.registry),
        state.client.clone(),
        state.config.gateway.execution,
    );

    match engine.perform(&ctx).await {
        Ok(response) => render(response),
        Err(e) => error_response(&e),
    }
}

/// Map engine output onto an HTTP response: primary status, the primary's
/// surfaceable headers, and the serialized composite body.
fn render(gateway_response: GatewayResponse) -> Response {
    let (bytes, content_type) = match gateway_response.body() {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = gateway_response.status;
    for (name, value) in gateway_response.forwarded_headers() {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().append(name, value);
        }
    }
    if let Some(content_type) = content_type {
        if let Ok(value) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(CONTENT_TYPE, value);
        }
    }
    response
}

fn error_response(e: &GatewayError) -> Response {
    error!(error = %e, "Gateway request failed");
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(e.to_json_body()))
        .unwrap_or_default()
}
