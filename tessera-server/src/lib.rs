pub mod app;
pub mod extract;

pub use app::{build_router, AppState};
