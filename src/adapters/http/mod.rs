//! HTTP adapter - the Axum surface.

pub mod dto;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::app_router;
pub use state::AppState;
