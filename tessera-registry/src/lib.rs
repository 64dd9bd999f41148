pub mod memory;

use async_trait::async_trait;
use tessera_core::{GatewayError, JoinRecord, LogicModule, LogicModuleModel, Relationship};

pub use memory::MemoryRegistry;

/// Read-only query interface over the gateway's service registry.
///
/// The request engine treats the registry as a pure query provider;
/// implementations may be backed by a database, a config file, or a remote
/// service. Nothing in the engine ever writes through this trait.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Retrieve a LogicModule by service name.
    async fn logic_module(&self, endpoint_name: &str) -> Result<LogicModule, GatewayError>;

    /// Retrieve the model for `(service, endpoint)`, e.g. `("crm", "/contacts/")`.
    async fn model(
        &self,
        endpoint_name: &str,
        endpoint: &str,
    ) -> Result<LogicModuleModel, GatewayError>;

    /// All relationships touching `model`, forward edges first, each flagged
    /// with the traversal direction. The returned order is the order in which
    /// relationship keys are embedded.
    async fn relationships(
        &self,
        model: &LogicModuleModel,
    ) -> Result<Vec<(Relationship, bool)>, GatewayError>;

    /// Join records linking `origin_pk` through `relationship` in the given
    /// direction, in registry order.
    async fn join_records(
        &self,
        origin_pk: &str,
        relationship: &Relationship,
        is_forward: bool,
    ) -> Result<Vec<JoinRecord>, GatewayError>;
}
