//! Service layer: business logic over repository and substrate ports.

pub mod cadence;
pub mod enrollment;

pub use cadence::CadenceService;
pub use enrollment::EnrollmentCoordinator;
