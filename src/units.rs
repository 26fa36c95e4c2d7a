//! Replace generated units in the networkd runtime directory.
//!
//! Every step is attempted even if an earlier one failed, so that as much
//! of the new configuration as possible ends up on disk.

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{Context, Result};
use slog_scope::{debug, error, info};

use crate::network::{NetworkUnit, UNIT_PREFIX, UNIT_SUFFIX};

/// Default directory for systemd-networkd runtime units.
pub const DEFAULT_UNITS_DIR: &str = "/run/systemd/network";

/// Prefix of temporary files, which never match the unit naming.
const TEMP_PREFIX: &str = ".hcloud-netconf-";

/// Whether a directory entry was generated by us.
fn is_generated_unit(name: &str) -> bool {
    name.len() >= UNIT_PREFIX.len() + UNIT_SUFFIX.len()
        && name.starts_with(UNIT_PREFIX)
        && name.ends_with(UNIT_SUFFIX)
}

/// Whether a directory entry is a temporary file left by an interrupted run.
fn is_leftover_tempfile(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

/// Remove all previously generated units, then write `units`.
///
/// Returns `true` only if every step succeeded.
pub fn sync_network_units(dir: &Path, units: &[NetworkUnit]) -> bool {
    let mut ok = true;

    if let Err(e) = fs::create_dir_all(dir) {
        error!("creating {:?}: {}", dir, e);
        ok = false;
    }

    ok &= remove_stale_units(dir);

    for unit in units {
        match write_unit(dir, unit) {
            Ok(()) => {}
            Err(e) => {
                error!("writing unit for {:?}: {:#}", unit.name, e);
                ok = false;
            }
        }
    }

    ok
}

fn remove_stale_units(dir: &Path) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("reading directory {:?}: {}", dir, e);
            return false;
        }
    };

    let mut ok = true;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                error!("reading directory {:?}: {}", dir, e);
                ok = false;
                continue;
            }
        };
        let name = entry.file_name();
        let stale = name
            .to_str()
            .map_or(false, |n| is_generated_unit(n) || is_leftover_tempfile(n));
        if !stale {
            continue;
        }
        let path = entry.path();
        match entry.file_type() {
            Ok(ft) if ft.is_file() || ft.is_symlink() => {}
            Ok(_) => {
                debug!("skipping {:?}, not a file", path);
                continue;
            }
            Err(e) => {
                error!("inspecting {:?}: {}", path, e);
                ok = false;
                continue;
            }
        }
        debug!("removing {:?}", path);
        if let Err(e) = fs::remove_file(&path) {
            error!("removing {:?}: {}", path, e);
            ok = false;
        }
    }
    ok
}

/// Atomically write a single unit into `dir`.
fn write_unit(dir: &Path, unit: &NetworkUnit) -> Result<()> {
    let path = dir.join(unit.sd_network_unit_name()?);

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)
        .with_context(|| format!("failed to create temporary file in {:?}", dir))?;
    tmp.write_all(unit.config().as_bytes())
        .with_context(|| format!("failed to write {:?}", tmp.path()))?;
    tmp.as_file()
        .set_permissions(Permissions::from_mode(0o644))
        .with_context(|| format!("failed to set permissions on {:?}", tmp.path()))?;
    tmp.persist(&path)
        .with_context(|| format!("failed to persist {:?}", path))?;

    info!("wrote {:?}", path);
    Ok(())
}
