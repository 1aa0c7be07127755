//! Shared helpers for tests that need a migrated database.

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Connects to a fresh in-memory SQLite database with all migrations applied.
///
/// The pool is capped at a single connection: every pooled connection to
/// `sqlite::memory:` opens its own blank database, so a second connection
/// would not see the migrated schema. Interleaved queries still contend for
/// the store the way they do in production.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:".to_owned());
    opts.max_connections(1);

    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
