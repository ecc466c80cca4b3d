pub mod config;
mod cry_routes;
mod dto;
mod http_layers;
mod pet_routes;
pub mod server;
mod session;
pub mod state;
mod user_routes;

pub use config::ServerConfig;
pub use http_layers::{log_requests, RequestsLoggingLevel};
pub use server::{make_app, run_server};
