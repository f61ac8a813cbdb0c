use crate::config::ConfigError;

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Protocol translation error: {0}")]
    Translation(String),
}

impl GatewayError {
    /// True for errors that originate on the upstream side of the
    /// translation rather than in this process.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GatewayError::Upstream { .. } | GatewayError::Transport(_)
        )
    }
}
