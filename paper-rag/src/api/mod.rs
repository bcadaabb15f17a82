//! API module for the QA HTTP server

pub mod routes;
pub mod server;

pub use routes::ApiError;
pub use server::{ApiServer, ApiServerConfig};
