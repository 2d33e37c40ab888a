//! Configuration loading and CLI flags, mirroring `bin/testnet/src/main.rs`'s
//! `clap::Parser` shape. Config loading is an external-collaborator concern
//! per spec.md §1, but a runnable binary still needs somewhere to put it.

use std::path::{Path, PathBuf};

use clap::Parser;
use eyre::{Context, Result};
use pms_types::Config;

#[derive(Parser, Debug)]
#[clap(about = "Peer mesh manager for a declared set of consensus-layer P2P nodes")]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[clap(short, long, default_value = "pms.toml")]
    pub config: PathBuf,

    /// Forces dry-run even if the config file says otherwise.
    #[clap(long)]
    pub dry_run: bool
}

/// Loads and validates the configuration file named on the CLI. The only
/// fatal startup condition named in spec.md §7 is invalid configuration; any
/// parse failure is surfaced as an `eyre::Report` and the process must not
/// start.
pub fn load(cli: &Cli) -> Result<Config> {
    let mut config = load_from_path(&cli.config)?;
    if cli.dry_run {
        config.dry_run = true;
    }
    validate(&config)?;
    Ok(config)
}

fn load_from_path(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config file at {}", path.display()))?;
    toml::from_str(&raw).wrap_err_with(|| format!("parsing config file at {}", path.display()))
}

fn validate(config: &Config) -> Result<()> {
    if config.networks.is_empty() {
        eyre::bail!("configuration must declare at least one network");
    }
    for (network_name, network) in &config.networks {
        if network.members.is_empty() {
            eyre::bail!("network '{network_name}' declares no members");
        }
        for member in &network.members {
            if network.node(member).is_none() {
                eyre::bail!("network '{network_name}' declares member '{member}' with no node config");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn rejects_a_member_with_no_node_config() {
        let file = write_config(
            r#"
            poll_interval = "30s"
            rpc_timeout = "5s"
            node_state_expiration = "2m"

            [networks.mainnet]
            members = ["p1", "p2"]

            [networks.mainnet.nodes.p1]
            rpc_address = "http://p1:9000"
            "#
        );
        let config = load_from_path(file.path()).expect("parses");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn cli_dry_run_overrides_the_file() {
        let file = write_config(
            r#"
            poll_interval = "30s"
            rpc_timeout = "5s"
            node_state_expiration = "2m"
            dry_run = false

            [networks.mainnet]
            members = ["p1"]

            [networks.mainnet.nodes.p1]
            rpc_address = "http://p1:9000"
            "#
        );
        let cli = Cli { config: file.path().to_path_buf(), dry_run: true };
        let config = load(&cli).expect("valid config");
        assert!(config.dry_run);
    }
}
