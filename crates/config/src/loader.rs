use std::path::Path;

use crate::{Config, DirectoryConfig, ImpersonationConfig, error::Error};

pub(crate) fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub(crate) fn parse(content: &str) -> crate::Result<Config> {
    let config: Config = toml::from_str(content)?;

    validate_impersonation(&config.impersonation)?;
    validate_tokens(&config.directory)?;

    for warning in warnings(&config) {
        log::warn!("{warning}");
    }

    Ok(config)
}

fn validate_impersonation(config: &ImpersonationConfig) -> crate::Result<()> {
    let required = [
        ("admin_role", &config.admin_role),
        ("switch_role", &config.switch_role),
        ("target_parameter", &config.target_parameter),
        ("token_parameter", &config.token_parameter),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(Error::Invalid(format!("impersonation.{name} must not be blank")));
        }
    }

    if config.admin_role == config.switch_role {
        return Err(Error::Invalid(format!(
            "impersonation.admin_role and impersonation.switch_role must differ (both are '{}')",
            config.admin_role
        )));
    }

    if config.target_parameter == config.token_parameter {
        return Err(Error::Invalid(format!(
            "impersonation.target_parameter and impersonation.token_parameter must differ (both are '{}')",
            config.target_parameter
        )));
    }

    Ok(())
}

/// Every token must authenticate a configured user. The token itself is
/// never echoed back in the error.
fn validate_tokens(config: &DirectoryConfig) -> crate::Result<()> {
    for username in config.tokens.values() {
        if config.users.contains_key(username) {
            continue;
        }

        return Err(Error::Invalid(format!(
            "A token in [directory.tokens] refers to user '{username}', which is not defined in [directory.users]"
        )));
    }

    Ok(())
}

fn warnings(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();
    let impersonation = &config.impersonation;

    if !impersonation.enabled || !config.directory.has_users() {
        return warnings;
    }

    if config.directory.users_with_role(&impersonation.admin_role).next().is_none() {
        warnings.push(format!(
            "No user in [directory.users] holds the admin role '{}'; impersonation requests will be ignored",
            impersonation.admin_role
        ));
    }

    warnings
}
