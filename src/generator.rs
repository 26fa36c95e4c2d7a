//! Single-shot flow: make the metadata service reachable, fetch the network
//! configuration, and replace the generated networkd units.

use std::path::Path;

use anyhow::{bail, Result};
use slog_scope::{debug, info, warn};

use crate::network::link::{self, LinkActivation, LinkControl};
use crate::network::render_units;
use crate::providers::hetzner::HetznerProvider;
use crate::units;

/// Run the whole generation sequence once.
///
/// A temporarily activated link is always reverted before returning.
pub fn generate<L: LinkControl>(
    links: &L,
    provider: &HetznerProvider,
    units_dir: &Path,
    activate: bool,
) -> Result<()> {
    let status = link::find_link_status(links);

    let _activation = match status.fallback {
        Some(fallback) if activate => {
            match LinkActivation::activate(links, fallback) {
                Ok(activation) => Some(activation),
                Err(e) => {
                    warn!("{:#}", e);
                    None
                }
            }
        }
        Some(fallback) => {
            debug!("not activating {}", fallback.name);
            None
        }
        None => None,
    };

    let metadata = provider.fetch_metadata()?;

    let units = render_units(&metadata.network_config.entries);
    info!(
        "rendered {} network units from {} entries",
        units.len(),
        metadata.network_config.entries.len()
    );

    if !units::sync_network_units(units_dir, &units) {
        bail!("failed to update network units in {:?}", units_dir);
    }

    Ok(())
}
