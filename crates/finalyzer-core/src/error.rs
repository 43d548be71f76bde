//! Error types for Finalyzer

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    /// A ledger store or semantic index call failed while building the candidate set
    #[error("Retrieval failed during {phase}: {source}")]
    Retrieval {
        phase: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap a collaborator error with the retrieval phase it happened in
    pub fn retrieval(phase: &'static str, source: Error) -> Self {
        Self::Retrieval {
            phase,
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
