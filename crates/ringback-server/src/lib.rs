//! Axum HTTP surface for the Ringback relay.

pub mod routes;
pub mod server;
pub mod state;

pub use server::{router, start_server};
pub use state::AppState;
