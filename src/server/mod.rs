//! HTTP server: handlers, router, and the builder that wires
//! configuration into a running application.

pub mod builder;
pub mod handlers;

pub use builder::{ServerBuilder, router};
pub use handlers::AppState;
