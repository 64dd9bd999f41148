use serde::{Deserialize, Serialize};

/// A registered upstream micro-service.
///
/// `endpoint_name` is the stable identifier used in inbound gateway URLs
/// (`/{service}/...`); `schema_url` is where its OpenAPI document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicModule {
    pub endpoint_name: String,

    /// URL of the service's OpenAPI JSON document.
    pub schema_url: String,

    /// Overrides the API base URL derived from the OpenAPI document.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// One resource type exposed by a LogicModule.
///
/// `(logic_module_endpoint_name, endpoint)` is unique across the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicModuleModel {
    pub logic_module_endpoint_name: String,

    /// Path fragment with surrounding slashes, e.g. `/products/`.
    pub endpoint: String,

    /// Attribute of an upstream payload holding this model's join key.
    pub lookup_field_name: String,
}

/// Reference to a LogicModuleModel by its unique key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub logic_module_endpoint_name: String,
    pub endpoint: String,
}

impl LogicModuleModel {
    pub fn model_ref(&self) -> ModelRef {
        ModelRef {
            logic_module_endpoint_name: self.logic_module_endpoint_name.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl ModelRef {
    /// The bare model name used in gateway URLs: `/products/` → `products`.
    pub fn model_name(&self) -> &str {
        self.endpoint.trim_matches('/')
    }
}
