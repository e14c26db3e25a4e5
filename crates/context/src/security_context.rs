use crate::Identity;

/// Holds the identity currently considered authenticated for one request.
///
/// Lives in the request extensions. Written by upstream authentication and
/// at most once more by the impersonation gate.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct SecurityContext {
    authentication: Option<Identity>,
}

/// What the active identity slot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState<'a> {
    Unset,
    Primary(&'a Identity),
    Substitute {
        identity: &'a Identity,
        basis: &'a Identity,
    },
}

impl SecurityContext {
    pub fn new(identity: Identity) -> Self {
        Self {
            authentication: Some(identity),
        }
    }

    pub fn authentication(&self) -> Option<&Identity> {
        self.authentication.as_ref()
    }

    /// Replaces the active identity, returning the one it displaced.
    pub fn set_authentication(&mut self, identity: Identity) -> Option<Identity> {
        self.authentication.replace(identity)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication.is_some()
    }

    pub fn state(&self) -> SlotState<'_> {
        let Some(identity) = self.authentication.as_ref() else {
            return SlotState::Unset;
        };

        match identity.switch_source() {
            Some(basis) => SlotState::Substitute { identity, basis },
            None => SlotState::Primary(identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::Role;

    #[test]
    fn empty_context_is_unset() {
        let context = SecurityContext::default();

        assert_eq!(context.state(), SlotState::Unset);
        assert!(!context.is_authenticated());
    }

    #[test]
    fn state_follows_the_switch_marker() {
        let bob = Identity::with_authorities("bob", ["ROLE_ADMIN"]);
        let mut context = SecurityContext::new(bob.clone());
        assert_eq!(context.state(), SlotState::Primary(&bob));

        let roles = vec![
            Role::authority_of("ROLE_USER"),
            Role::switch_marker("ROLE_PREVIOUS_ADMINISTRATOR", bob.clone()),
        ];
        let alice = Identity::new("alice", SecretString::from(String::new()), roles);

        let displaced = context.set_authentication(alice.clone());
        assert_eq!(displaced, Some(bob.clone()));

        assert_eq!(
            context.state(),
            SlotState::Substitute {
                identity: &alice,
                basis: &bob,
            }
        );
    }
}
