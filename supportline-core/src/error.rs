use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Client details not found: {0}")]
    ClientNotFound(String),

    #[error("Agent profile not found: {0}")]
    AgentNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl SupportError {
    /// True for lookups that missed, as opposed to infrastructure failures.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SupportError::SessionNotFound(_)
                | SupportError::ClientNotFound(_)
                | SupportError::AgentNotFound(_)
                | SupportError::TagNotFound(_)
        )
    }
}
