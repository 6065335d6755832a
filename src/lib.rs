//! Damage analysis engine library.

pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod inference;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::EngineConfig;
pub use dispatch::RequestDispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
