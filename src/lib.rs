//! Traffic sign recognition relay
//!
//! Accepts one uploaded image per request, hands it to an external vision
//! worker process under a wall-clock deadline, and reports the recognised
//! sign. The uploaded file is deleted on every path.

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod server;
pub mod services;

pub use server::{bind_with_fallback, build_router};
