use serde::Deserialize;

/// Role a caller must hold to impersonate other users.
pub const DEFAULT_ADMIN_ROLE: &str = "ROLE_ADMIN";

/// Name of the marker role attached to substitute identities.
pub const DEFAULT_SWITCH_ROLE: &str = "ROLE_PREVIOUS_ADMINISTRATOR";

/// Impersonation gate settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImpersonationConfig {
    /// When disabled the gate is not installed in the request pipeline.
    pub enabled: bool,
    /// Exact role name that identifies an administrator.
    pub admin_role: String,
    /// Role name carried by the switch marker of a substitute identity.
    pub switch_role: String,
    /// Request parameter holding the username to switch to.
    pub target_parameter: String,
    /// Request parameter holding the caller's access token.
    pub token_parameter: String,
    /// Form bodies larger than this are passed through without being inspected.
    pub max_form_bytes: usize,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_role: DEFAULT_ADMIN_ROLE.to_owned(),
            switch_role: DEFAULT_SWITCH_ROLE.to_owned(),
            target_parameter: "impersonate".to_owned(),
            token_parameter: "access_token".to_owned(),
            max_form_bytes: 64 * 1024,
        }
    }
}
