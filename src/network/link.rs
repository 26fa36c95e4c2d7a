// Copyright 2023 CoreOS, Inc.
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

//! Link probing and temporary activation.
//!
//! The metadata service is only reachable over IPv4 link-local, so at least
//! one ethernet link must be up before fetching. If none is, the first
//! ethernet-like interface is brought up with a link-local address for the
//! duration of the run.

use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use ipnetwork::{IpNetwork, Ipv4Network};
use pnet_base::MacAddr;
use slog_scope::{debug, info, trace, warn};

use super::ip_cli;

/// Name prefixes of ethernet-like interfaces.
const ETHERNET_PREFIXES: [&str; 2] = ["en", "eth"];

/// Address assigned to a temporarily activated link.
pub fn link_local_address() -> Result<IpNetwork> {
    let net = Ipv4Network::new(Ipv4Addr::new(169, 254, 0, 1), 16)
        .context("failed to build link-local network")?;
    Ok(IpNetwork::V4(net))
}

/// A network interface as seen by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkInfo {
    pub name: String,
    pub index: u32,
    pub mac_address: Option<MacAddr>,
    /// Administrative "up" flag.
    pub up: bool,
}

impl LinkInfo {
    fn is_ethernet(&self) -> bool {
        ETHERNET_PREFIXES.iter().any(|p| self.name.starts_with(p))
    }
}

/// Host primitives for inspecting and toggling links.
pub trait LinkControl {
    /// List interfaces, in host order.
    fn links(&self) -> Result<Vec<LinkInfo>>;
    fn set_up(&self, link: &LinkInfo) -> Result<()>;
    fn set_down(&self, link: &LinkInfo) -> Result<()>;
    /// Add a link-scoped address.
    fn address_add(&self, link: &LinkInfo, addr: &IpNetwork) -> Result<()>;
    fn address_del(&self, link: &LinkInfo, addr: &IpNetwork) -> Result<()>;
}

/// `LinkControl` backed by the running kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostLinks;

impl LinkControl for HostLinks {
    fn links(&self) -> Result<Vec<LinkInfo>> {
        let links = pnet_datalink::interfaces()
            .into_iter()
            .map(|iface| LinkInfo {
                up: iface.is_up(),
                name: iface.name,
                index: iface.index,
                mac_address: iface.mac,
            })
            .collect();
        Ok(links)
    }

    fn set_up(&self, link: &LinkInfo) -> Result<()> {
        ip_cli::ip_link_set_up(&link.name)
    }

    fn set_down(&self, link: &LinkInfo) -> Result<()> {
        ip_cli::ip_link_set_down(&link.name)
    }

    fn address_add(&self, link: &LinkInfo, addr: &IpNetwork) -> Result<()> {
        ip_cli::ip_address_add(&link.name, addr)
    }

    fn address_del(&self, link: &LinkInfo, addr: &IpNetwork) -> Result<()> {
        ip_cli::ip_address_del(&link.name, addr)
    }
}

/// Outcome of a link probe.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkStatus {
    /// Some ethernet link is already up.
    pub have_link: bool,
    /// First ethernet link seen, if none is up.
    pub fallback: Option<LinkInfo>,
}

/// Check whether an ethernet link is up, and pick a fallback otherwise.
///
/// Enumeration errors are logged and treated as an empty interface list.
pub fn find_link_status<L: LinkControl>(links: &L) -> LinkStatus {
    let all = match links.links() {
        Ok(all) => all,
        Err(e) => {
            warn!("listing network interfaces: {:#}", e);
            vec![]
        }
    };
    debug!("found {} network interfaces", all.len());

    let mut fallback = None;
    for link in all {
        trace!(
            "interface {} (index {}, mac {:?}, up: {})",
            link.name,
            link.index,
            link.mac_address,
            link.up
        );
        if !link.is_ethernet() {
            continue;
        }
        if link.up {
            info!("ethernet interface {} is up", link.name);
            return LinkStatus {
                have_link: true,
                fallback: None,
            };
        }
        if fallback.is_none() {
            fallback = Some(link);
        }
    }

    match fallback {
        Some(ref link) => info!("no ethernet interface is up, fallback is {}", link.name),
        None => warn!("no ethernet interfaces"),
    }
    LinkStatus {
        have_link: false,
        fallback,
    }
}

/// A link brought up for the duration of a run.
///
/// Dropping it removes the link-local address and brings the link back down.
pub struct LinkActivation<'a, L: LinkControl> {
    links: &'a L,
    link: LinkInfo,
    address: IpNetwork,
}

impl<'a, L: LinkControl> LinkActivation<'a, L> {
    /// Bring `link` up with a link-local address.
    ///
    /// On failure any partial state has already been reverted.
    pub fn activate(links: &'a L, link: LinkInfo) -> Result<Self> {
        let address = link_local_address()?;

        links
            .set_up(&link)
            .with_context(|| format!("bringing up {}", link.name))?;

        if let Err(e) = links.address_add(&link, &address) {
            if let Err(down_err) = links.set_down(&link) {
                warn!("bringing down {}: {:#}", link.name, down_err);
            }
            return Err(e.context(format!(
                "adding link-local address to {}",
                link.name
            )));
        }

        info!("temporarily activated {} with {}", link.name, address);
        Ok(Self {
            links,
            link,
            address,
        })
    }
}

impl<L: LinkControl> Drop for LinkActivation<'_, L> {
    fn drop(&mut self) {
        debug!("deactivating {}", self.link.name);
        if let Err(e) = self.links.address_del(&self.link, &self.address) {
            warn!(
                "removing link-local address from {}: {:#}",
                self.link.name, e
            );
        }
        if let Err(e) = self.links.set_down(&self.link) {
            warn!("bringing down {}: {:#}", self.link.name, e);
        }
    }
}
