//! API route declarations

pub mod metrics_routes;
pub mod system_routes;
