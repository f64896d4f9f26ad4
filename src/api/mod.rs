//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod auth;
mod compositions;
mod profile;

pub use auth::*;
pub use compositions::*;
pub use profile::*;

/// Handler result type; errors map to status codes via `AppError`.
pub type ApiResult<T> = Result<T, crate::errors::AppError>;
