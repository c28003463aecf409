use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration, resolved once at startup from the environment and
/// passed down explicitly. Nothing else reads env vars.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the sqlite database and the media tree.
    pub workspace: PathBuf,
    pub listen: SocketAddr,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        let workspace = std::env::var("CARDBOOKD_WORKSPACE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./cardbook-data"));
        let listen = match std::env::var("CARDBOOKD_ADDR") {
            Ok(v) => v
                .parse()
                .map_err(|e| anyhow::anyhow!("bad CARDBOOKD_ADDR {:?}: {}", v, e))?,
            Err(_) => SocketAddr::from(([127, 0, 0, 1], 8807)),
        };
        Ok(Config { workspace, listen })
    }
}
