//! API Module
//!
//! The demo origin, the operational endpoints and their routing.
//!
//! # Endpoints
//! - `GET /hello` - fresh for 60 seconds
//! - `GET /default` - no freshness information
//! - `GET /private` - never stored
//! - `POST /echo` - echoes the body, fresh for 30 seconds
//! - `GET /stats` - store statistics
//! - `GET /health` - health check

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
