//! Response models for the operational endpoints
//!
//! This module defines the JSON bodies served next to the cached routes.

pub mod responses;

pub use responses::{HealthResponse, StatsResponse};
