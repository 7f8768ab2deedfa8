use kibotos_types::KibotosError;

/// Errors surfaced by store primitives.
///
/// Business-rule failures (rate limited, wrong state, lease lost, ...) map
/// directly onto [`KibotosError`] variants; everything else (connection
/// failure, constraint violation that is not one of our business guards)
/// is infra and collapses to `Internal` at the API boundary, per the
/// error-handling design: the store does not retry, the caller does.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] KibotosError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<StoreError> for KibotosError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Domain(e) => e,
            StoreError::Database(e) => KibotosError::Internal(e.to_string()),
            StoreError::Migrate(e) => KibotosError::Internal(e.to_string()),
        }
    }
}
