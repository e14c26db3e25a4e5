use impersonation::AuthorityError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Internal server error")]
    Internal,
}

impl From<AuthorityError> for AuthError {
    fn from(error: AuthorityError) -> Self {
        match error {
            AuthorityError::InvalidToken => {
                log::debug!("Rejecting request with an invalid access token");
                Self::Unauthorized
            }
            AuthorityError::Unavailable(reason) => {
                log::error!("Token authority unavailable while authenticating request: {reason}");
                Self::Internal
            }
        }
    }
}
