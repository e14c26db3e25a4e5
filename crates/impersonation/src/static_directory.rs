//! In-memory collaborators built from [`config::DirectoryConfig`].

use std::{collections::HashMap, sync::Arc};

use config::DirectoryConfig;
use context::{Identity, Role};
use secrecy::SecretString;

use crate::{AuthorityError, DirectoryError, PrincipalDirectory, TokenAuthority};

/// Principal directory backed by a fixed set of users.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: HashMap<String, Identity>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DirectoryConfig) -> Self {
        let users = config.users.iter().map(|(username, user)| {
            let credentials = user
                .password
                .clone()
                .unwrap_or_else(|| SecretString::from(String::new()));

            let roles = user.roles.iter().map(Role::authority_of).collect();

            Identity::new(username.clone(), credentials, roles)
        });

        users.fold(Self::new(), Self::with_user)
    }

    #[must_use]
    pub fn with_user(mut self, identity: Identity) -> Self {
        self.insert(identity);
        self
    }

    pub fn insert(&mut self, identity: Identity) {
        self.users.insert(identity.username().to_owned(), identity);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl PrincipalDirectory for StaticDirectory {
    fn lookup(&self, username: &str) -> Result<Identity, DirectoryError> {
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(username.to_owned()))
    }
}

/// Token authority backed by a fixed token table.
///
/// Tokens map to usernames, which are resolved through the directory on
/// every call so the returned roles are always the directory's.
#[derive(Clone)]
pub struct StaticTokenAuthority {
    tokens: HashMap<String, String>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl StaticTokenAuthority {
    pub fn new(directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self {
            tokens: HashMap::new(),
            directory,
        }
    }

    pub fn from_config(config: &DirectoryConfig, directory: Arc<dyn PrincipalDirectory>) -> Self {
        config
            .tokens
            .iter()
            .fold(Self::new(directory), |authority, (token, username)| {
                authority.with_token(token.clone(), username.clone())
            })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, username: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), username.into());
        self
    }
}

impl TokenAuthority for StaticTokenAuthority {
    fn resolve(&self, token: &str) -> Result<Identity, AuthorityError> {
        let username = self.tokens.get(token).ok_or(AuthorityError::InvalidToken)?;

        self.directory.lookup(username).map_err(|err| match err {
            DirectoryError::NotFound(username) => {
                AuthorityError::Unavailable(format!("token owner '{username}' is not in the directory"))
            }
            DirectoryError::Unavailable(reason) => AuthorityError::Unavailable(reason),
        })
    }
}
