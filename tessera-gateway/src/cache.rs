use crate::client::{OutboundRequest, UpstreamClient, UpstreamResponse};
use dashmap::DashMap;
use std::sync::Arc;
use tessera_core::{GatewayError, LogicModule};
use tessera_openapi::ApiSpec;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Per-request OpenAPI document cache, keyed by `schema_url`.
///
/// Single-flight: the first task to miss a key starts the fetch inside the
/// key's `OnceCell`; concurrent misses await the same initialization, so each
/// schema URL is contacted at most once per inbound request. A failed fetch
/// leaves the cell empty and the next caller retries.
#[derive(Default)]
pub struct SpecCache {
    cells: DashMap<String, Arc<OnceCell<Arc<ApiSpec>>>>,
}

impl SpecCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch(
        &self,
        client: &UpstreamClient,
        module: &LogicModule,
    ) -> Result<Arc<ApiSpec>, GatewayError> {
        let cell = self.cells.entry(module.schema_url.clone()).or_default().clone();

        if let Some(spec) = cell.get() {
            debug!(schema_url = %module.schema_url, "Spec cache hit");
            return Ok(Arc::clone(spec));
        }

        cell.get_or_try_init(|| async {
            let document = client.fetch_document(&module.schema_url).await?;
            let spec = ApiSpec::from_document(
                &document,
                &module.schema_url,
                module.base_url.as_deref(),
            )?;
            info!(
                service = %module.endpoint_name,
                schema_url = %module.schema_url,
                operations = spec.operation_count(),
                "Fetched OpenAPI document"
            );
            Ok(Arc::new(spec))
        })
        .await
        .cloned()
    }
}

/// Per-request response cache for cache-eligible sub-requests, keyed by
/// resolved URL.
///
/// The join fan-out commonly re-fetches the same related record several
/// times; memoizing parameter-free GETs avoids that amplification without
/// cross-request staleness. Same single-flight shape as the spec cache, so
/// a shared related record is fetched exactly once even under the concurrent
/// executor.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, Arc<OnceCell<UpstreamResponse>>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_send(
        &self,
        client: &UpstreamClient,
        request: &OutboundRequest,
    ) -> Result<UpstreamResponse, GatewayError> {
        if !request.is_cacheable() {
            return client.send(request).await;
        }

        let cell = self.entries.entry(request.url.clone()).or_default().clone();

        if let Some(hit) = cell.get() {
            debug!(url = %request.url, "Taking data from response cache");
            return Ok(hit.clone());
        }

        cell.get_or_try_init(|| client.send(request)).await.cloned()
    }
}
