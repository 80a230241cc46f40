//! HTTP surface: router, auth middleware, response shaping.

pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use server::{build_router, start_server, AppState};
