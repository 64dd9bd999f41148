pub mod cache;
pub mod client;
pub mod context;
mod executor;
pub mod payload;
pub mod planner;
pub mod request;

pub use cache::{ResponseCache, SpecCache};
pub use client::{OutboundBody, OutboundRequest, UpstreamClient, UpstreamResponse};
pub use context::{FilePart, RequestContext, GATEWAY_PARAMS};
pub use payload::Payload;
pub use planner::{JoinPlan, PlanItem};
pub use request::{GatewayRequest, GatewayResponse};
