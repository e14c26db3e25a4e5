mod directory;
mod error;
mod impersonation;
mod loader;
mod server;

use std::path::Path;

use serde::Deserialize;

pub use directory::{DirectoryConfig, UserConfig};
pub use error::Error;
pub use impersonation::{DEFAULT_ADMIN_ROLE, DEFAULT_SWITCH_ROLE, ImpersonationConfig};
pub use server::{ServerConfig, TlsConfig};

pub type Result<T> = std::result::Result<T, error::Error>;

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub impersonation: ImpersonationConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl Config {
    /// Reads and validates a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        loader::load(path)
    }

    /// Parses and validates a TOML configuration string.
    pub fn from_toml(content: &str) -> crate::Result<Config> {
        loader::parse(content)
    }
}
