pub mod checkin;
pub mod models;
pub mod test_utils;

use sea_orm::{Database, DatabaseConnection};
use std::path::Path;
use util::config;

/// Connects to the database named by `DATABASE_PATH`.
///
/// The value may be a full DSN (`sqlite:`, `postgres://`, `mysql://`) or a
/// bare SQLite file path. Bare paths get their parent directory created and
/// `mode=rwc` appended so a first run starts from an empty file.
pub async fn connect() -> DatabaseConnection {
    let configured = config::database_path();
    let is_dsn = ["sqlite:", "postgres://", "mysql://"]
        .iter()
        .any(|scheme| configured.starts_with(scheme));

    let url = if is_dsn {
        configured
    } else {
        if let Some(parent) = Path::new(&configured).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{configured}?mode=rwc")
    };

    Database::connect(&url)
        .await
        .expect("Failed to connect to database")
}
