mod pg_pool;
mod repositories;

pub use repositories::InMemoryJobStore;
pub use repositories::PgJobStore;

pub use pg_pool::{create_pool, open_job_store, run_migrations};
