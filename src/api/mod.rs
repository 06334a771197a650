//! API Module
//!
//! HTTP handlers and routing of the cache inspector.
//!
//! # Endpoints
//! - `GET /stats` - Aggregated statistics, `?memory=true` to estimate memory
//! - `POST /reclaim` - Clear weak-held values
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
