//! Data models for the lineup backend.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod composition;
mod user;

pub use composition::*;
pub use user::*;
