//! In-memory repositories backed by `DashMap`.
//!
//! The definition store and enrollment registry are owned maps that live for
//! the lifetime of the process. Clones share the same map.

pub mod cadence;
pub mod enrollment;
pub mod history;

pub use cadence::InMemoryCadenceRepository;
pub use enrollment::InMemoryEnrollmentRepository;
pub use history::InMemoryHistoryRepository;
