//! Tidechat server library
//!
//! Exposes the router and state so integration tests can drive the full
//! HTTP surface against mock providers.

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
