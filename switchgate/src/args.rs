use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "switchgate", version, about = "Authenticating HTTP gateway with admin impersonation")]
pub struct Args {
    /// IP address and port the server listens on. Overrides the configuration file.
    #[arg(short, long, env = "SWITCHGATE_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,

    /// Path to the TOML configuration file.
    #[arg(short, long, env = "SWITCHGATE_CONFIG_PATH", default_value = "./switchgate.toml")]
    pub config: PathBuf,

    /// Log filter, e.g. "info" or "server=debug,impersonation=debug".
    #[arg(long = "log", env = "SWITCHGATE_LOG", default_value = "info")]
    pub log_filter: String,
}
