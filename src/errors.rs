use thiserror::Error;

/// Boxed error produced by a payload codec.
pub type CodecError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Driver or connectivity failure, carried unchanged from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payload codec error: {0}")]
    Codec(#[source] CodecError),

    #[error("{field} is {len} characters, limit is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True when the underlying driver reported a closed pool.
    pub fn is_pool_closed(&self) -> bool {
        matches!(self, StoreError::Database(sqlx::Error::PoolClosed))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Codec(Box::new(err))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
