use serde_json::{Map, Value};
use tessera_core::{related_lookup, GatewayError, LogicModuleModel};
use tessera_registry::Registry;
use tracing::warn;

/// One planned join sub-request.
///
/// Items address their embed target positionally (`record_idx` +
/// `relationship_key`) rather than holding references into the payload; the
/// executors hand results back in plan order and `apply_results` re-navigates
/// the payload on insertion.
#[derive(Debug, Clone)]
pub struct PlanItem {
    pub service: String,
    pub model: String,
    pub pk: String,
    pub record_idx: usize,
    pub relationship_key: String,
}

pub type JoinPlan = Vec<PlanItem>;

/// Expand a primary payload into join sub-requests.
///
/// Initializes every relationship key on every record to an empty array (the
/// key is present even when no join records exist), then emits one plan item
/// per join record. Performs no I/O beyond registry reads.
///
/// A record without the configured lookup field fails the join on a detail
/// view; on a list view the record is skipped with a log entry and keeps no
/// relationship keys.
pub async fn plan_joins(
    payload: &mut Value,
    primary_model: &LogicModuleModel,
    registry: &dyn Registry,
) -> Result<JoinPlan, GatewayError> {
    let relationships = registry.relationships(primary_model).await?;
    if relationships.is_empty() {
        return Ok(Vec::new());
    }

    let detail = is_detail_view(payload);
    let mut plan = Vec::new();

    for idx in 0..record_count(payload) {
        let Some(record) = record_at_mut(payload, idx) else {
            warn!(record = idx, "Skipping non-object entry in list response");
            continue;
        };

        let Some(origin_pk) = record
            .get(&primary_model.lookup_field_name)
            .and_then(pk_string)
        else {
            if detail {
                return Err(GatewayError::DataMesh(format!(
                    "lookup_field_name \"{}\" not found in response",
                    primary_model.lookup_field_name
                )));
            }
            warn!(
                record = idx,
                lookup_field = %primary_model.lookup_field_name,
                "Record has no lookup field, skipping join for it"
            );
            continue;
        };

        for (relationship, is_forward) in &relationships {
            record.insert(relationship.key.clone(), Value::Array(Vec::new()));

            let join_records = registry
                .join_records(&origin_pk, relationship, *is_forward)
                .await?;
            for join_record in &join_records {
                let Some((model_ref, pk)) = related_lookup(*is_forward, relationship, join_record)
                else {
                    warn!(
                        relationship = %relationship.key,
                        origin_pk = %origin_pk,
                        "Join record has no usable related key, skipping"
                    );
                    continue;
                };
                plan.push(PlanItem {
                    service: model_ref.logic_module_endpoint_name.clone(),
                    model: model_ref.model_name().to_string(),
                    pk,
                    record_idx: idx,
                    relationship_key: relationship.key.clone(),
                });
            }
        }
    }

    Ok(plan)
}

/// Pagination convention: an object wrapping a `results` array is a list
/// response and the planner operates over that array.
fn effective(payload: &Value) -> &Value {
    if let Value::Object(map) = payload {
        if let Some(results @ Value::Array(_)) = map.get("results") {
            return results;
        }
    }
    payload
}

fn is_detail_view(payload: &Value) -> bool {
    effective(payload).is_object()
}

pub(crate) fn record_count(payload: &Value) -> usize {
    match effective(payload) {
        Value::Object(_) => 1,
        Value::Array(items) => items.len(),
        _ => 0,
    }
}

pub(crate) fn record_at_mut(payload: &mut Value, idx: usize) -> Option<&mut Map<String, Value>> {
    match payload {
        Value::Object(map) => {
            if map.get("results").is_some_and(Value::is_array) {
                map.get_mut("results")?
                    .as_array_mut()?
                    .get_mut(idx)?
                    .as_object_mut()
            } else if idx == 0 {
                Some(map)
            } else {
                None
            }
        }
        Value::Array(items) => items.get_mut(idx).and_then(Value::as_object_mut),
        _ => None,
    }
}

fn pk_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
