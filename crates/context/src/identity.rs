use std::{fmt, sync::Arc};

use secrecy::{ExposeSecret, SecretString};

/// A principal with its credentials and granted roles.
#[derive(Clone, Debug)]
pub struct Identity {
    username: String,
    credentials: SecretString,
    roles: Vec<Role>,
}

impl Identity {
    pub fn new(username: impl Into<String>, credentials: SecretString, roles: Vec<Role>) -> Self {
        Self {
            username: username.into(),
            credentials,
            roles,
        }
    }

    /// Identity with empty credentials and the given plain roles.
    pub fn with_authorities<I, S>(username: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles = authorities.into_iter().map(Role::authority_of).collect();
        Self::new(username, SecretString::from(String::new()), roles)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn credentials(&self) -> &SecretString {
        &self.credentials
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Role names, switch markers included.
    pub fn authorities(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(Role::authority)
    }

    /// Whether a plain role with exactly this name was granted.
    ///
    /// Switch markers never match, even when their name is equal.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.roles
            .iter()
            .any(|role| matches!(role, Role::Authority(name) if name == authority))
    }

    /// The identity this one was switched from, if any.
    ///
    /// With several markers present, the last one in role order wins.
    pub fn switch_source(&self) -> Option<&Arc<Identity>> {
        self.roles.iter().rev().find_map(|role| match role {
            Role::SwitchMarker { source, .. } => Some(source),
            Role::Authority(_) => None,
        })
    }

    pub fn is_substitute(&self) -> bool {
        self.switch_source().is_some()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.credentials.expose_secret() == other.credentials.expose_secret()
            && self.roles == other.roles
    }
}

impl Eq for Identity {}

/// A granted role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Role {
    /// A plain role name such as `ROLE_USER`.
    Authority(String),
    /// Marks an identity installed by an impersonation switch.
    SwitchMarker {
        authority: String,
        /// The identity that was active before the switch.
        source: Arc<Identity>,
    },
}

impl Role {
    pub fn authority_of(name: impl Into<String>) -> Self {
        Self::Authority(name.into())
    }

    pub fn switch_marker(authority: impl Into<String>, source: Identity) -> Self {
        Self::SwitchMarker {
            authority: authority.into(),
            source: Arc::new(source),
        }
    }

    pub fn authority(&self) -> &str {
        match self {
            Self::Authority(name) => name,
            Self::SwitchMarker { authority, .. } => authority,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_markers_are_not_plain_authorities() {
        let bob = Identity::with_authorities("bob", ["ROLE_ADMIN"]);
        let roles = vec![
            Role::authority_of("ROLE_USER"),
            Role::switch_marker("ROLE_ADMIN", bob),
        ];
        let alice = Identity::new("alice", SecretString::from("secret"), roles);

        assert!(alice.has_authority("ROLE_USER"));
        assert!(!alice.has_authority("ROLE_ADMIN"));
        assert_eq!(alice.authorities().collect::<Vec<_>>(), ["ROLE_USER", "ROLE_ADMIN"]);
    }

    #[test]
    fn last_switch_marker_wins() {
        let bob = Identity::with_authorities("bob", ["ROLE_ADMIN"]);
        let carol = Identity::with_authorities("carol", ["ROLE_ADMIN"]);
        let roles = vec![
            Role::switch_marker("ROLE_PREVIOUS_ADMINISTRATOR", bob),
            Role::authority_of("ROLE_USER"),
            Role::switch_marker("ROLE_PREVIOUS_ADMINISTRATOR", carol),
        ];
        let alice = Identity::new("alice", SecretString::from(String::new()), roles);

        let source = alice.switch_source().map(|source| source.username());
        assert_eq!(source, Some("carol"));
        assert!(alice.is_substitute());
    }

    #[test]
    fn primary_identity_has_no_source() {
        let bob = Identity::with_authorities("bob", ["ROLE_ADMIN"]);

        assert!(bob.switch_source().is_none());
        assert!(!bob.is_substitute());
    }

    #[test]
    fn credentials_take_part_in_equality() {
        let first = Identity::new("bob", SecretString::from("one"), Vec::new());
        let second = Identity::new("bob", SecretString::from("two"), Vec::new());

        assert_ne!(first, second);
        assert_eq!(first, first.clone());
    }

    #[test]
    fn debug_output_redacts_credentials() {
        let bob = Identity::new("bob", SecretString::from("hunter2"), Vec::new());

        assert!(!format!("{bob:?}").contains("hunter2"));
    }
}
