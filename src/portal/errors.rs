//! Error types for the TeachAssist portal client.

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("portal login failed: {0}")]
    LoginFailed(String),
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}
