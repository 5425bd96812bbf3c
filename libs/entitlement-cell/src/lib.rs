pub mod gate;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use gate::{EntitlementGate, require_access};
pub use models::*;
pub use services::{AccessCache, AccessService};
pub use router::entitlement_routes;
