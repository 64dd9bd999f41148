use crate::Registry;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::RwLock;
use tessera_core::{
    GatewayError, JoinRecord, LogicModule, LogicModuleModel, RegistrySeed, Relationship,
};
use tracing::debug;

/// In-memory registry backend.
///
/// Modules and models live in DashMaps for lock-free lookup; relationships
/// and join records keep insertion order, which is the embed-order contract
/// of `Registry::relationships` / `Registry::join_records`.
#[derive(Default)]
pub struct MemoryRegistry {
    modules: DashMap<String, LogicModule>,
    models: DashMap<(String, String), LogicModuleModel>,
    relationships: RwLock<Vec<Relationship>>,
    join_records: RwLock<Vec<JoinRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from declarative config contents.
    pub fn from_seed(seed: RegistrySeed) -> Self {
        let registry = Self::new();
        for module in seed.modules {
            registry.add_module(module);
        }
        for model in seed.models {
            registry.add_model(model);
        }
        for relationship in seed.relationships {
            registry.add_relationship(relationship);
        }
        for record in seed.join_records {
            registry.add_join_record(record);
        }
        registry
    }

    pub fn add_module(&self, module: LogicModule) {
        debug!(service = %module.endpoint_name, "Registering logic module");
        self.modules.insert(module.endpoint_name.clone(), module);
    }

    pub fn add_model(&self, model: LogicModuleModel) {
        let key = (
            model.logic_module_endpoint_name.clone(),
            model.endpoint.clone(),
        );
        self.models.insert(key, model);
    }

    pub fn add_relationship(&self, relationship: Relationship) {
        self.relationships
            .write()
            .expect("relationship lock poisoned")
            .push(relationship);
    }

    pub fn add_join_record(&self, record: JoinRecord) {
        self.join_records
            .write()
            .expect("join record lock poisoned")
            .push(record);
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn logic_module(&self, endpoint_name: &str) -> Result<LogicModule, GatewayError> {
        self.modules
            .get(endpoint_name)
            .map(|m| m.clone())
            .ok_or_else(|| GatewayError::ServiceNotFound(endpoint_name.to_string()))
    }

    async fn model(
        &self,
        endpoint_name: &str,
        endpoint: &str,
    ) -> Result<LogicModuleModel, GatewayError> {
        self.models
            .get(&(endpoint_name.to_string(), endpoint.to_string()))
            .map(|m| m.clone())
            .ok_or_else(|| {
                GatewayError::DataMesh(format!(
                    "no model registered for service \"{endpoint_name}\" endpoint \"{endpoint}\""
                ))
            })
    }

    async fn relationships(
        &self,
        model: &LogicModuleModel,
    ) -> Result<Vec<(Relationship, bool)>, GatewayError> {
        let model_ref = model.model_ref();
        let relationships = self
            .relationships
            .read()
            .expect("relationship lock poisoned");

        let mut result: Vec<(Relationship, bool)> = relationships
            .iter()
            .filter(|r| r.origin_model == model_ref)
            .map(|r| (r.clone(), true))
            .collect();
        result.extend(
            relationships
                .iter()
                .filter(|r| r.related_model == model_ref)
                .map(|r| (r.clone(), false)),
        );
        Ok(result)
    }

    async fn join_records(
        &self,
        origin_pk: &str,
        relationship: &Relationship,
        is_forward: bool,
    ) -> Result<Vec<JoinRecord>, GatewayError> {
        let records = self.join_records.read().expect("join record lock poisoned");
        let matches = records
            .iter()
            .filter(|r| r.relationship_key == relationship.key)
            .filter(|r| {
                if is_forward {
                    r.origin_pk == origin_pk
                } else {
                    r.related_pk().as_deref() == Some(origin_pk)
                }
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}
