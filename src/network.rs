// Copyright 2017 CoreOS, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! network translates the provider network configuration into
//! `systemd.network` units. All that is left is to write the resulting
//! strings to the unit directory.

use anyhow::{bail, Result};

use crate::providers::hetzner::{EntryKind, NetworkConfigEntry, SubnetKind};

pub mod ip_cli;
pub mod link;

/// Common prefix for generated units.
///
/// systemd-network-generator writes `70-*`, so these sort after it, while
/// kernel command-line settings in higher-priority units still win.
pub const UNIT_PREFIX: &str = "80-hetzner-";
/// Extension of `systemd.network` units.
pub const UNIT_SUFFIX: &str = ".network";

/// Which DHCP clients networkd should run for an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DhcpMode {
    Ipv4,
    Ipv6,
    Both,
}

impl DhcpMode {
    /// Combine per-family wishes into a mode, if any.
    pub fn from_flags(v4: bool, v6: bool) -> Option<Self> {
        match (v4, v6) {
            (true, true) => Some(DhcpMode::Both),
            (true, false) => Some(DhcpMode::Ipv4),
            (false, true) => Some(DhcpMode::Ipv6),
            (false, false) => None,
        }
    }

    /// Value for the `DHCP=` setting.
    fn sd_network_value(&self) -> &'static str {
        match *self {
            DhcpMode::Ipv4 => "ipv4",
            DhcpMode::Ipv6 => "ipv6",
            DhcpMode::Both => "yes",
        }
    }
}

/// A single `[Network]` setting, kept in declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkDirective {
    Address(String),
    Gateway(String),
    Dns(String),
}

/// An interface unit, matched by MAC address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkUnit {
    /// Provider-assigned name, only used to name the unit file.
    pub name: String,
    pub mac_address: String,
    pub directives: Vec<NetworkDirective>,
    pub dhcp: Option<DhcpMode>,
}

impl NetworkUnit {
    /// Build the unit for a single provider entry.
    pub fn from_entry(entry: &NetworkConfigEntry) -> Self {
        let mut directives = vec![];
        let mut want_dhcp4 = false;
        let mut want_dhcp6 = false;

        for subnet in &entry.subnets {
            if subnet.kind == SubnetKind::Dhcp {
                want_dhcp4 |= subnet.ipv4;
                want_dhcp6 |= subnet.ipv6;
            }
            if let Some(addr) = non_empty(&subnet.address) {
                directives.push(NetworkDirective::Address(addr));
            }
            if let Some(gw) = non_empty(&subnet.gateway) {
                directives.push(NetworkDirective::Gateway(gw));
            }
            for ns in &subnet.dns_nameservers {
                directives.push(NetworkDirective::Dns(ns.clone()));
            }
        }

        NetworkUnit {
            name: entry.name.clone(),
            mac_address: entry.mac_address.clone(),
            directives,
            dhcp: DhcpMode::from_flags(want_dhcp4, want_dhcp6),
        }
    }

    /// Return the deterministic `systemd.network` unit name for this device.
    pub fn sd_network_unit_name(&self) -> Result<String> {
        // The prefix keeps "", "." and ".." valid file names.
        if self.name.contains(['/', '\0']) {
            bail!("invalid network entry name {:?}", self.name);
        }
        Ok(format!("{}{}{}", UNIT_PREFIX, self.name, UNIT_SUFFIX))
    }

    pub fn config(&self) -> String {
        let mut config = String::new();

        // [Match] section
        // Interface names given by the provider don't match the kernel ones.
        config.push_str("[Match]\n");
        config.push_str(&format!("MACAddress={}\n", self.mac_address));

        // [Network] section
        // The metadata service sits on an IPv4 link-local address.
        config.push_str("\n[Network]\n");
        config.push_str("LinkLocalAddressing=yes\n");
        for directive in &self.directives {
            let line = match directive {
                NetworkDirective::Address(addr) => format!("Address={}\n", addr),
                NetworkDirective::Gateway(gw) => format!("Gateway={}\n", gw),
                NetworkDirective::Dns(ns) => format!("DNS={}\n", ns),
            };
            config.push_str(&line);
        }
        if let Some(dhcp) = self.dhcp {
            config.push_str(&format!("DHCP={}\n", dhcp.sd_network_value()));
        }

        config
    }
}

/// Translate provider entries into units; non-physical entries are skipped.
pub fn render_units(entries: &[NetworkConfigEntry]) -> Vec<NetworkUnit> {
    entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::Physical)
        .map(NetworkUnit::from_entry)
        .collect()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
