//! HTTP surface: the generate endpoint, connectivity probes and static files.
pub mod handlers;
pub mod routes;

pub use routes::{router, AppState};
