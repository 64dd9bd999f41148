pub mod pk;
pub mod spec;

pub use pk::is_canonical_uuid;
pub use spec::{ApiSpec, Operation, ResolvedOperation};
