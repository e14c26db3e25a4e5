use std::sync::Arc;

use config::ImpersonationConfig;
use context::{Identity, RequestDetails, Role, SecurityContext, SwitchEvent};

use crate::{
    EventSink, ImpersonationError, ImpersonationResult, PrincipalDirectory, RequestParameters, TokenAuthority,
};

/// A request the gate can inspect and whose active identity it can replace.
pub trait GateRequest {
    /// First value of the named query or form parameter.
    fn parameter(&self, name: &str) -> Option<String>;

    /// Connection details recorded with a switch.
    fn details(&self) -> RequestDetails {
        RequestDetails::default()
    }

    /// The request's active identity slot, created empty when missing.
    fn security_context_mut(&mut self) -> &mut SecurityContext;
}

impl<B> GateRequest for http::Request<B> {
    fn parameter(&self, name: &str) -> Option<String> {
        match self.extensions().get::<RequestParameters>() {
            Some(parameters) => parameters.get(name).map(str::to_owned),
            None => RequestParameters::from_query(self.uri().query())
                .get(name)
                .map(str::to_owned),
        }
    }

    fn details(&self) -> RequestDetails {
        self.extensions().get::<RequestDetails>().copied().unwrap_or_default()
    }

    fn security_context_mut(&mut self) -> &mut SecurityContext {
        self.extensions_mut().get_or_insert_default::<SecurityContext>()
    }
}

/// Outcome of a successful switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switched {
    /// The administrator who requested the switch.
    pub admin: String,
    /// The identity now referenced by the switch marker.
    pub basis: String,
    /// The identity now active.
    pub target: String,
    /// Whether an earlier switch was unwound first.
    pub unwound: bool,
    /// Connection details of the triggering request.
    pub details: RequestDetails,
}

/// Lets an administrator act as another user for a single request.
pub struct ImpersonationGate {
    config: ImpersonationConfig,
    authority: Arc<dyn TokenAuthority>,
    directory: Arc<dyn PrincipalDirectory>,
    events: Option<Arc<dyn EventSink>>,
}

impl ImpersonationGate {
    pub fn new(
        config: ImpersonationConfig,
        authority: Arc<dyn TokenAuthority>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        Self {
            config,
            authority,
            directory,
            events: None,
        }
    }

    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &ImpersonationConfig {
        &self.config
    }

    /// Whether the request asks for a switch at all.
    pub fn requires_switch(&self, request: &impl GateRequest) -> bool {
        self.switch_target(request).is_some()
    }

    /// Runs the switch when requested, then hands the request to `chain`.
    ///
    /// Failures never reach the caller: they are logged and the request
    /// continues with its identity unchanged. `chain` runs exactly once on
    /// every path.
    pub fn handle<R, T>(&self, mut request: R, chain: impl FnOnce(R) -> T) -> T
    where
        R: GateRequest,
    {
        if let Some(target) = self.switch_target(&request) {
            let token = request.parameter(&self.config.token_parameter);
            let details = request.details();

            let outcome =
                self.attempt_switch_with_details(&target, token.as_deref(), details, request.security_context_mut());

            match outcome {
                Ok(switched) => {
                    let remote = remote_address(switched.details);

                    log::info!(
                        admin = switched.admin.as_str(),
                        target = switched.target.as_str(),
                        remote = remote.as_str();
                        "User successfully impersonated by admin '{}', switched to '{}'",
                        switched.admin,
                        switched.target
                    );
                }
                Err(err) => {
                    log::log!(err.level(), "Impersonation of '{target}' not performed: {err}");
                }
            }
        }

        chain(request)
    }

    /// Tries to replace the active identity in `context` with `target`.
    ///
    /// On error `context` is left untouched and no event is published.
    pub fn attempt_switch(
        &self,
        target: &str,
        access_token: Option<&str>,
        context: &mut SecurityContext,
    ) -> ImpersonationResult<Switched> {
        self.attempt_switch_with_details(target, access_token, RequestDetails::default(), context)
    }

    /// Same as [`attempt_switch`](Self::attempt_switch), recording `details` on
    /// the outcome and on every published event.
    pub fn attempt_switch_with_details(
        &self,
        target: &str,
        access_token: Option<&str>,
        details: RequestDetails,
        context: &mut SecurityContext,
    ) -> ImpersonationResult<Switched> {
        log::debug!("Attempt to switch to user '{target}'");

        let token = access_token.ok_or(ImpersonationError::TokenInvalid)?;
        let admin = self.authority.resolve(token)?;

        if !admin.has_authority(&self.config.admin_role) {
            return Err(ImpersonationError::NotAuthorized {
                username: admin.username().to_owned(),
            });
        }

        let current = context
            .authentication()
            .cloned()
            .ok_or(ImpersonationError::NoCurrentIdentity)?;

        let target = self.directory.lookup(target)?;

        let (basis, unwound) = match current.switch_source() {
            Some(source) => {
                let source = Identity::clone(source);
                log::debug!("Found original switch user '{}'", source.username());
                self.publish(SwitchEvent::exit(current, source.clone()).with_details(details));
                (source, true)
            }
            None => (current, false),
        };

        let substitute = self.substitute_for(&target, basis.clone());
        log::debug!("Switch user identity: {substitute:?}");

        context.set_authentication(substitute.clone());

        let switched = Switched {
            admin: admin.username().to_owned(),
            basis: basis.username().to_owned(),
            target: substitute.username().to_owned(),
            unwound,
            details,
        };

        self.publish(SwitchEvent::enter(basis, substitute).with_details(details));

        Ok(switched)
    }

    fn switch_target(&self, request: &impl GateRequest) -> Option<String> {
        request
            .parameter(&self.config.target_parameter)
            .filter(|username| !username.trim().is_empty())
    }

    fn substitute_for(&self, target: &Identity, basis: Identity) -> Identity {
        // A substitute carries exactly one marker, whatever the directory returned.
        let mut roles: Vec<Role> = target
            .roles()
            .iter()
            .filter(|role| !matches!(role, Role::SwitchMarker { .. }))
            .cloned()
            .collect();

        roles.push(Role::switch_marker(self.config.switch_role.clone(), basis));

        Identity::new(target.username(), target.credentials().clone(), roles)
    }

    fn publish(&self, event: SwitchEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

pub(crate) fn remote_address(details: RequestDetails) -> String {
    details
        .remote_address
        .map_or_else(|| "unknown".to_owned(), |address| address.to_string())
}
