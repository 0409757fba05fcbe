use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The embedding capability could not be reached (connect failure, timeout).
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The embedding capability answered, but not with a usable vector.
    #[error("Embedding provider error: {0}")]
    ProviderError(String),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Vector index schema error: {0}")]
    SchemaError(String),

    #[error("Lexical store error: {0}")]
    LexicalStore(String),

    #[error("Catalog store error: {0}")]
    Catalog(String),

    /// Deployment mismatch (e.g. embedding dimension vs. collection dimension).
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    /// Fatal errors mean the deployment itself is wrong; they are never
    /// degraded into empty results or per-item skips.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_) | Error::SchemaError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
