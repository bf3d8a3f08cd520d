//! Core Module - infrastructure shared by the whole application
//!
//! - Session authentication and role checks
//! - Configuration
//! - Error handling
//! - Decimal formatting
//! - Application state

pub mod auth;
pub mod config;
pub mod error;
pub mod money;
pub mod state;

pub use auth::{
    Claims, OptionalUser, authentication_middleware, decode_session_token,
    optional_authentication_middleware, require_role,
};
pub use config::Config;
pub use error::AppError;
pub use state::AppState;
