//! Petcry Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod auth;
pub mod error;
pub mod inspection;
pub mod pet_store;
pub mod predict;
pub mod profile_image;
pub mod server;
pub mod sqlite_persistence;
pub mod vocab;

// Re-export commonly used types for convenience
pub use error::{ApiError, ApiResult};
pub use pet_store::{FullStore, SqlitePetStore};
pub use server::{make_app, run_server, RequestsLoggingLevel};
