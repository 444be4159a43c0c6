// HTTP server modules
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod tables;

// Conversation sessions for the chat flow
pub mod chat;

// Table service clients (REST, Postgres, in-memory)
pub mod store;

// Model service layer
pub mod llm;

pub use config::AppConfig;
pub use routes::{configure_routes, AppState};
