//! Static principal directory and token table.
//!
//! Stands in for an external user store and token authority in small
//! deployments and in tests.

use indexmap::IndexMap;
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Users keyed by username.
    pub users: IndexMap<String, UserConfig>,
    /// Access tokens mapped to the username they authenticate.
    pub tokens: IndexMap<String, String>,
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UserConfig {
    pub password: Option<SecretString>,
    pub roles: Vec<String>,
}

impl DirectoryConfig {
    pub fn has_users(&self) -> bool {
        !self.users.is_empty()
    }

    /// Usernames holding the given role.
    pub fn users_with_role<'a>(&'a self, role: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.users
            .iter()
            .filter(move |(_, user)| user.roles.iter().any(|r| r == role))
            .map(|(name, _)| name.as_str())
    }
}
