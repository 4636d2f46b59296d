//! HTTP request handlers for the REST API.

pub mod cadence;
pub mod enrollment;
pub mod health;
