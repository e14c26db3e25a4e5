//! Services the gate depends on but does not implement.

use context::{Identity, SwitchEvent};

use crate::error::{AuthorityError, DirectoryError};

/// Resolves an opaque access token to the identity that presented it.
pub trait TokenAuthority: Send + Sync {
    fn resolve(&self, token: &str) -> Result<Identity, AuthorityError>;
}

/// Resolves a username to a full identity with its granted roles.
pub trait PrincipalDirectory: Send + Sync {
    fn lookup(&self, username: &str) -> Result<Identity, DirectoryError>;
}

/// Receives identity switch notifications.
///
/// Publishing is best effort: implementations must not block and have no
/// way to report failure back to the gate.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SwitchEvent);
}
