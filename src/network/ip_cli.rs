//! Helpers for shelling out to the `ip` command.

use anyhow::{bail, Context, Result};
use ipnetwork::IpNetwork;
use slog_scope::trace;
use std::process::Command;

/// Set a named interface administratively up.
pub(crate) fn ip_link_set_up(dev_name: &str) -> Result<()> {
    let mut cmd = Command::new("ip");
    cmd.args(["link", "set"]).args(["dev", dev_name]).arg("up");
    try_exec(cmd).context("'ip link set up' failed")
}

/// Set a named interface administratively down.
pub(crate) fn ip_link_set_down(dev_name: &str) -> Result<()> {
    let mut cmd = Command::new("ip");
    cmd.args(["link", "set"]).args(["dev", dev_name]).arg("down");
    try_exec(cmd).context("'ip link set down' failed")
}

/// Add a link-scoped address to an interface.
pub(crate) fn ip_address_add(dev_name: &str, ip_addr: &IpNetwork) -> Result<()> {
    let mut cmd = Command::new("ip");
    cmd.args(["address", "add"])
        .arg(ip_addr.to_string())
        .args(["scope", "link"])
        .args(["dev", dev_name]);
    try_exec(cmd).context("'ip address add' failed")
}

/// Remove an address from an interface.
pub(crate) fn ip_address_del(dev_name: &str, ip_addr: &IpNetwork) -> Result<()> {
    let mut cmd = Command::new("ip");
    cmd.args(["address", "del"])
        .arg(ip_addr.to_string())
        .args(["dev", dev_name]);
    try_exec(cmd).context("'ip address del' failed")
}

/// Try to execute, and log stderr on failure.
fn try_exec(cmd: Command) -> Result<()> {
    let mut cmd = cmd;
    trace!("{:?}", &cmd);

    let output = cmd
        .output()
        .with_context(|| format!("failed to run {:?}", cmd.get_program()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{}", stderr.trim_end());
    };

    Ok(())
}
