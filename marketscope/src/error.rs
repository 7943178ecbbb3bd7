use thiserror::Error;

pub type Result<T> = std::result::Result<T, MarketscopeError>;

#[derive(Debug, Error)]
pub enum MarketscopeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid {argument}: {value}")]
    InvalidArgument { argument: &'static str, value: String },
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error("execution error: {0}")]
    Execution(String),
    #[error("query timed out after {0} ms")]
    Timeout(u64),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarketscopeError {
    pub fn invalid(argument: &'static str, value: impl std::fmt::Display) -> Self {
        Self::InvalidArgument {
            argument,
            value: value.to_string(),
        }
    }
}
