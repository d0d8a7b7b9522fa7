//! docchat: upload a PDF, then ask questions answered from its text only.

pub mod config;
pub mod error;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, app_router, run_server};
pub use store::{DocumentRecord, DocumentStore};
