use thiserror::Error;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Query(diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("vector index error: {0}")]
    VectorIndex(String),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(error: diesel::result::Error) -> Self {
        match error {
            diesel::result::Error::NotFound => RepositoryError::NotFound,
            other => RepositoryError::Query(other),
        }
    }
}
