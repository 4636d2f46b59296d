//! HTTP layer for the cadence service.
//!
//! Two routers share the envelope response format:
//! - [`router`]: the public REST API at `/api/v1/` plus `/health`.
//! - [`worker`]: the substrate surface served by `cadence worker`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod router;
pub mod worker;
