//! Command-line arguments parsing.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use crate::generator;
use crate::network::link::HostLinks;
use crate::providers::hetzner::{HetznerProvider, HETZNER_METADATA_URL};
use crate::units::DEFAULT_UNITS_DIR;

/// Generate systemd-networkd units from Hetzner Cloud metadata
#[derive(Debug, Parser)]
#[clap(display_name = "hcloud-netconf")]
#[clap(version)]
pub(crate) struct CliConfig {
    /// The directory into which network units are written
    #[arg(long = "network-units", value_name = "path", default_value = DEFAULT_UNITS_DIR)]
    network_units_dir: PathBuf,
    /// The URL of the metadata document
    #[arg(long, value_name = "url", default_value = HETZNER_METADATA_URL)]
    metadata_url: String,
    /// Timeout for fetching metadata, in seconds
    #[arg(long = "timeout", value_name = "secs", default_value_t = 10)]
    timeout_secs: u64,
    /// Never bring up an interface to reach the metadata service
    #[arg(long)]
    no_activate: bool,
    /// Increase log verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CliConfig {
    /// Run the generator once against the host links.
    pub fn run(self) -> Result<()> {
        let provider = HetznerProvider::try_new(
            self.metadata_url,
            Duration::from_secs(self.timeout_secs),
        )
        .context("initializing metadata client")?;

        generator::generate(
            &HostLinks,
            &provider,
            &self.network_units_dir,
            !self.no_activate,
        )
    }
}

/// Parse command-line arguments into CLI configuration.
pub(crate) fn parse_args(argv: impl IntoIterator<Item = String>) -> Result<CliConfig> {
    let cfg = match CliConfig::try_parse_from(argv) {
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayHelp => e.exit(),
        Err(e) if e.kind() == clap::error::ErrorKind::DisplayVersion => e.exit(),
        v => v,
    }?;
    Ok(cfg)
}
