pub mod history;
pub mod memory;
pub mod postgres;

pub use history::HistoryStore;
pub use memory::InMemoryHistoryStore;
pub use postgres::{create_pool, run_migrations, PgHistoryStore};
