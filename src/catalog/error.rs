use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("TLE directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("TLE file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Invalid TLE format in {source_name}: {message}")]
    InvalidTle {
        source_name: String,
        message: String,
    },
    #[error("TLE feed {source_name} failed: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: reqwest::Error,
    },
    #[error("TLE feed {source_name} returned no objects")]
    EmptyFeed { source_name: String },
}
