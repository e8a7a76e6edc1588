use thiserror::Error;

/// Errors a single profile's pipeline can hit during one cycle.
///
/// Everything except `Config` is scoped to one profile and one cycle: the
/// scheduler logs it and moves on to the next profile.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("No applications found for {0}")]
    NoApplicationsFound(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Expected outcomes that should not be reported at error level.
    pub fn is_benign(&self) -> bool {
        matches!(self, AppError::NoApplicationsFound(_))
    }
}
