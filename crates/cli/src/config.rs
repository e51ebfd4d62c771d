//! Command-line configuration.

use crate::commands::{Command, CommandResult, Session};
use anyhow::Context;
use clap::Parser;
use replication::RingConfig;
use std::path::PathBuf;

/// Drive a block ring backed by an in-process cluster.
#[derive(Debug, Parser)]
#[command(name = "blockring")]
#[command(about = "Replicated block and log store on a consistent-hashing ring")]
#[command(version)]
pub struct CliConfig {
    /// JSON ring configuration (peer set size, proximity shifting)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of hosts in the ring
    #[arg(long, default_value_t = 5, global = true)]
    pub hosts: usize,

    /// Virtual nodes per host
    #[arg(long, default_value_t = 8, global = true)]
    pub vnodes: usize,

    /// Mark every vnode of a host unreachable (repeatable, before the subcommand)
    #[arg(long = "down", value_name = "HOST")]
    pub down: Vec<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Ring configuration from `--config`, or the defaults.
    pub fn ring_config(&self) -> anyhow::Result<RingConfig> {
        let config = match &self.config {
            Some(path) => RingConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => RingConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Run the subcommand on a fresh runtime and print its result.
    pub fn run(self) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("starting tokio runtime")?;
        let result = runtime.block_on(self.execute())?;
        println!("{}", result);
        Ok(())
    }

    /// Build the cluster, apply `--down`, and run the subcommand.
    pub async fn execute(&self) -> anyhow::Result<CommandResult> {
        anyhow::ensure!(self.hosts > 0, "--hosts must be at least 1");
        anyhow::ensure!(self.vnodes > 0, "--vnodes must be at least 1");

        let ring_config = self.ring_config()?;
        let session = Session::start(self.hosts, self.vnodes, &ring_config)?;
        for host in &self.down {
            session.take_down(host)?;
        }
        self.command.execute(session).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::try_parse_from(["blockring", "locate", "k"]).unwrap();
        assert_eq!(config.hosts, 5);
        assert_eq!(config.vnodes, 8);
        assert!(config.down.is_empty());
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.ring_config().unwrap(), RingConfig::default());
    }

    #[test]
    fn test_repeated_down_flags() {
        let config =
            CliConfig::try_parse_from(["blockring", "--down", "host-1", "--down", "host-2", "put", "x", "-v"]).unwrap();
        assert_eq!(config.down, vec!["host-1".to_string(), "host-2".to_string()]);
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_down_after_subcommand_is_rejected() {
        assert!(CliConfig::try_parse_from(["blockring", "put", "x", "--down", "host-2"]).is_err());
        assert!(CliConfig::try_parse_from(["blockring", "--down", "host-1", "put", "x", "--down", "host-2"]).is_err());
    }

    #[test]
    fn test_missing_config_file() {
        let config =
            CliConfig::try_parse_from(["blockring", "--config", "/nonexistent/ring.json", "locate", "k"]).unwrap();
        assert!(config.ring_config().is_err());
    }

    #[tokio::test]
    async fn test_zero_hosts_rejected() {
        let config = CliConfig::try_parse_from(["blockring", "--hosts", "0", "locate", "k"]).unwrap();
        assert!(config.execute().await.is_err());
    }
}
