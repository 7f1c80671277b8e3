use thiserror::Error;

use crate::repolist::RepositoryIdentifier;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GraphQL query failed: {0}")]
    GraphQLResponse(String),

    #[error("invalid data for {repository}: {reason}")]
    DataIntegrity { repository: String, reason: String },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("could not persist artifact: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl Error {
    pub fn missing_repository(id: &RepositoryIdentifier) -> Self {
        Error::GraphQLResponse(format!("repository {id} not found or inaccessible"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
