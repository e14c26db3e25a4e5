//! Request-scoped user impersonation.
//!
//! An administrator presenting a valid access token may ask, through a request
//! parameter, to act as another user for the rest of that request. The
//! [`ImpersonationGate`] resolves the caller through a [`TokenAuthority`],
//! checks the admin role, resolves the target through a [`PrincipalDirectory`]
//! and installs a substitute identity in the request's
//! [`SecurityContext`](context::SecurityContext). The substitute carries a
//! switch marker pointing back at the identity it replaced.
//!
//! Impersonation never blocks a request: when any step fails the request
//! continues with its identity unchanged.

mod collaborators;
mod error;
mod gate;
mod parameters;
mod sink;
mod static_directory;

pub use collaborators::{EventSink, PrincipalDirectory, TokenAuthority};
pub use error::{AuthorityError, DirectoryError, ImpersonationError, ImpersonationResult};
pub use gate::{GateRequest, ImpersonationGate, Switched};
pub use parameters::RequestParameters;
pub use sink::LogEventSink;
pub use static_directory::{StaticDirectory, StaticTokenAuthority};
