use crate::client::OutboundRequest;
use crate::context::RequestContext;
use crate::payload::Payload;
use crate::planner::{self, JoinPlan, PlanItem};
use crate::request::GatewayRequest;
use futures::future::join_all;
use http::Method;
use serde_json::Value;
use std::collections::BTreeSet;
use tessera_core::{ExecutionMode, GatewayError};
use tracing::{debug, error, warn};

/// Run every plan item and return its result in plan order.
///
/// `None` marks a failed or non-embeddable sub-request; the failure has
/// already been logged and must not affect the primary response.
pub(crate) async fn execute(
    engine: &GatewayRequest,
    ctx: &RequestContext,
    plan: &JoinPlan,
) -> Vec<Option<Value>> {
    match engine.mode() {
        ExecutionMode::Sequential => run_sequential(engine, ctx, plan).await,
        ExecutionMode::Concurrent => run_concurrent(engine, ctx, plan).await,
    }
}

async fn run_sequential(
    engine: &GatewayRequest,
    ctx: &RequestContext,
    plan: &JoinPlan,
) -> Vec<Option<Value>> {
    let mut results = Vec::with_capacity(plan.len());
    for item in plan {
        results.push(fetch_related(engine, ctx, item).await);
    }
    results
}

/// Two phases: warm the distinct related services' specs in parallel, then
/// fan out every sub-request at once. `join_all` yields results in input
/// order, which keeps the embed-order contract without any reordering.
async fn run_concurrent(
    engine: &GatewayRequest,
    ctx: &RequestContext,
    plan: &JoinPlan,
) -> Vec<Option<Value>> {
    warm_specs(engine, plan).await;
    join_all(plan.iter().map(|item| fetch_related(engine, ctx, item))).await
}

/// Fetch the OpenAPI documents of every service the plan touches, in
/// parallel, so the fan-out phase hits the spec cache instead of the network.
/// Best-effort: a warm-up failure resurfaces per plan item and is handled
/// there.
async fn warm_specs(engine: &GatewayRequest, plan: &JoinPlan) {
    let services: BTreeSet<&str> = plan.iter().map(|item| item.service.as_str()).collect();
    debug!(services = services.len(), "Warming related service specs");

    let warmups = services.into_iter().map(|service| async move {
        let result = match engine.registry().logic_module(service).await {
            Ok(module) => engine
                .specs()
                .get_or_fetch(engine.client(), &module)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(service = %service, error = %e, "Spec warm-up failed");
        }
    });
    join_all(warmups).await;
}

async fn fetch_related(
    engine: &GatewayRequest,
    ctx: &RequestContext,
    item: &PlanItem,
) -> Option<Value> {
    match try_fetch(engine, ctx, item).await {
        Ok(Some(value)) => Some(value),
        Ok(None) => {
            error!(
                service = %item.service,
                model = %item.model,
                pk = %item.pk,
                "No response data for join record"
            );
            None
        }
        Err(e) => {
            error!(
                service = %item.service,
                model = %item.model,
                pk = %item.pk,
                error = %e,
                "Join sub-request failed"
            );
            None
        }
    }
}

/// One join sub-request: spec, resolve, fetch through the response cache.
/// Only a 2xx JSON object is embeddable.
async fn try_fetch(
    engine: &GatewayRequest,
    ctx: &RequestContext,
    item: &PlanItem,
) -> Result<Option<Value>, GatewayError> {
    let module = engine.registry().logic_module(&item.service).await?;
    let spec = engine.specs().get_or_fetch(engine.client(), &module).await?;
    let operation = spec.resolve(&Method::GET, &item.model, Some(&item.pk))?;

    let request = OutboundRequest::related(&operation, ctx);
    let response = engine
        .responses()
        .get_or_send(engine.client(), &request)
        .await?;

    if !response.status.is_success() {
        return Err(GatewayError::Upstream(format!(
            "sub-request to {} returned {}",
            operation.url, response.status
        )));
    }

    match response.payload {
        Payload::Json(Value::Object(map)) => Ok(Some(Value::Object(map))),
        _ => Ok(None),
    }
}

/// Embed fetched records into the primary payload.
///
/// Walks the plan in emission order, so within one embed list the final order
/// equals the order of the join records that produced it — for both
/// executors. Failed items are simply absent.
pub(crate) fn apply_results(payload: &mut Value, plan: &JoinPlan, results: Vec<Option<Value>>) {
    for (item, result) in plan.iter().zip(results) {
        let Some(value) = result else { continue };
        if let Some(list) = planner::record_at_mut(payload, item.record_idx)
            .and_then(|record| record.get_mut(&item.relationship_key))
            .and_then(Value::as_array_mut)
        {
            list.push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(record_idx: usize, key: &str, pk: &str) -> PlanItem {
        PlanItem {
            service: "products".into(),
            model: "products".into(),
            pk: pk.into(),
            record_idx,
            relationship_key: key.into(),
        }
    }

    #[test]
    fn test_apply_results_preserves_plan_order() {
        let mut payload = json!({"id": 7, "items": []});
        let plan = vec![item(0, "items", "10"), item(0, "items", "11")];
        let results = vec![Some(json!({"id": 10})), Some(json!({"id": 11}))];

        apply_results(&mut payload, &plan, results);
        assert_eq!(payload["items"], json!([{"id": 10}, {"id": 11}]));
    }

    #[test]
    fn test_apply_results_omits_failures() {
        let mut payload = json!({"id": 7, "items": []});
        let plan = vec![item(0, "items", "10"), item(0, "items", "11")];
        let results = vec![None, Some(json!({"id": 11}))];

        apply_results(&mut payload, &plan, results);
        assert_eq!(payload["items"], json!([{"id": 11}]));
    }

    #[test]
    fn test_apply_results_targets_records_by_index() {
        let mut payload = json!({"results": [
            {"id": 1, "items": []},
            {"id": 2, "items": []}
        ]});
        let plan = vec![item(0, "items", "10"), item(1, "items", "10")];
        let results = vec![Some(json!({"id": 10})), Some(json!({"id": 10}))];

        apply_results(&mut payload, &plan, results);
        assert_eq!(payload["results"][0]["items"], json!([{"id": 10}]));
        assert_eq!(payload["results"][1]["items"], json!([{"id": 10}]));
    }

    #[test]
    fn test_apply_results_ignores_missing_targets() {
        // the record was skipped by the planner and never got the key
        let mut payload = json!([{"name": "no pk"}]);
        let plan = vec![item(0, "items", "10")];
        apply_results(&mut payload, &plan, vec![Some(json!({"id": 10}))]);
        assert!(payload[0].get("items").is_none());
    }
}
