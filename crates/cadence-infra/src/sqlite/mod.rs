//! SQLite storage for the workflow journal.

pub mod history;
pub mod pool;

pub use history::SqliteHistoryRepository;
pub use pool::DatabasePool;
