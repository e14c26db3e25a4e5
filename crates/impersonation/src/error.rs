use log::Level;
use thiserror::Error;

pub type ImpersonationResult<T> = std::result::Result<T, ImpersonationError>;

/// Why an impersonation attempt was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImpersonationError {
    /// The access token was missing or rejected by the token authority.
    #[error("Access token is missing or invalid")]
    TokenInvalid,

    #[error("Token authority unavailable: {0}")]
    AuthorityUnavailable(String),

    /// The caller authenticated but lacks the admin role.
    #[error("User '{username}' is not allowed to impersonate other users")]
    NotAuthorized { username: String },

    /// Nothing upstream authenticated this request.
    #[error("No current user associated with this request")]
    NoCurrentIdentity,

    #[error("Target user '{username}' not found")]
    TargetNotFound { username: String },

    #[error("Principal directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

impl ImpersonationError {
    /// Log level used when the gate swallows this error.
    pub fn level(&self) -> Level {
        match self {
            Self::NotAuthorized { .. } | Self::NoCurrentIdentity => Level::Warn,
            Self::AuthorityUnavailable(_) | Self::DirectoryUnavailable(_) => Level::Error,
            Self::TokenInvalid | Self::TargetNotFound { .. } => Level::Info,
        }
    }
}

/// Failure reported by a [`TokenAuthority`](crate::TokenAuthority).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorityError {
    #[error("Invalid access token")]
    InvalidToken,
    #[error("Token authority unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a [`PrincipalDirectory`](crate::PrincipalDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("User '{0}' not found")]
    NotFound(String),
    #[error("Principal directory unavailable: {0}")]
    Unavailable(String),
}

impl From<AuthorityError> for ImpersonationError {
    fn from(error: AuthorityError) -> Self {
        match error {
            AuthorityError::InvalidToken => Self::TokenInvalid,
            AuthorityError::Unavailable(reason) => Self::AuthorityUnavailable(reason),
        }
    }
}

impl From<DirectoryError> for ImpersonationError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::NotFound(username) => Self::TargetNotFound { username },
            DirectoryError::Unavailable(reason) => Self::DirectoryUnavailable(reason),
        }
    }
}
