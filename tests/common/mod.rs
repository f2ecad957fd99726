//! Helpers for integration tests.

use tempfile::TempDir;

use youthscan::db::{DbPool, establish_connection_pool};
use youthscan::repository::DieselRepository;

/// Temporary database used in integration tests. The backing directory is
/// removed when the value is dropped.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        let pool = establish_connection_pool(path.to_str().expect("utf-8 path"))
            .expect("Failed to establish SQLite connection.");
        TestDb { _dir: dir, pool }
    }

    pub fn pool(&self) -> DbPool {
        self.pool.clone()
    }

    pub fn repo(&self) -> DieselRepository {
        DieselRepository::new(self.pool())
    }
}
