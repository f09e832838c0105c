use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Could not open the database. {0}")]
    Database(#[from] sqlx::Error),
    #[error("Could not apply the schema migrations. {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
