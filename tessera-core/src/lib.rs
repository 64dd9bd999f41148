pub mod config;
pub mod error;
pub mod logic_module;
pub mod relationship;

pub use config::{EngineConfig, ExecutionMode, RegistrySeed, ServerConfig, TesseraConfig};
pub use error::GatewayError;
pub use logic_module::{LogicModule, LogicModuleModel, ModelRef};
pub use relationship::{related_lookup, JoinRecord, Relationship};
