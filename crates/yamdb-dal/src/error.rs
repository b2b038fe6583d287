pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Invalid order by field: {0}")]
    InvalidOrderByField(String),

    #[error("Unknown {entity}: {slug}")]
    UnknownReference { entity: &'static str, slug: String },

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Author has already reviewed this title")]
    DuplicateReview,
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Error::RecordNotFound("Record".to_string()),
            sqlx::Error::Database(e) if e.is_unique_violation() => {
                Error::UniqueViolation(e.message().to_string())
            }
            other => Error::DatabaseError(other),
        }
    }
}
