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

//! Metadata fetcher for the hetzner provider
//! https://docs.hetzner.cloud/#server-metadata

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::client;

#[cfg(test)]
mod mock_tests;

pub const HETZNER_METADATA_URL: &str = "http://169.254.169.254/hetzner/v1/metadata";

/// The only `network-config` layout we know how to translate.
const NETWORK_CONFIG_VERSION: i64 = 1;

/// Metadata provider for Hetzner Cloud
///
/// See: https://docs.hetzner.cloud/#server-metadata
#[derive(Clone, Debug)]
pub struct HetznerProvider {
    client: client::Client,
    url: String,
}

impl HetznerProvider {
    pub fn try_new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = client::Client::try_new(timeout)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    #[cfg(test)]
    pub(crate) fn mock_base_url(mut self, base_url: String) -> Self {
        self.client = self.client.mock_base_url(base_url);
        self
    }

    /// Fetch the metadata document and validate its network configuration.
    ///
    /// A document with an unknown `network-config` version is rejected
    /// as a whole.
    pub fn fetch_metadata(&self) -> Result<HetznerMetadata> {
        let meta: HetznerMetadata = self
            .client
            .get(client::Yaml, self.url.clone())
            .send()
            .context("fetching metadata")?;

        let version = meta.network_config.version;
        if version != NETWORK_CONFIG_VERSION {
            bail!("unknown network-config version {}", version);
        }

        Ok(meta)
    }
}

/// Root of the metadata document. Only the network part is kept.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct HetznerMetadata {
    #[serde(default)]
    pub network_config: NetworkConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default)]
    pub version: i64,
    #[serde(default, rename = "config")]
    pub entries: Vec<NetworkConfigEntry>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct NetworkConfigEntry {
    /// Provider-assigned name, only used for naming the generated unit.
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Physical,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Subnet {
    #[serde(default)]
    pub ipv4: bool,
    #[serde(default)]
    pub ipv6: bool,
    #[serde(default, rename = "type")]
    pub kind: SubnetKind,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub dns_nameservers: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubnetKind {
    Dhcp,
    Static,
    #[default]
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_deserialize() {
        let body = r#"availability-zone: hel1-dc2
hostname: my-server
instance-id: 42
network-config:
  config:
  - mac_address: 96:00:00:2a:4f:11
    name: eth0
    subnets:
    - ipv4: true
      type: dhcp
    - address: 2a01:4f9:c012:1234::1/64
      dns_nameservers:
      - 2a01:4ff:ff00::add:1
      - 2a01:4ff:ff00::add:2
      gateway: fe80::1
      ipv6: true
      type: static
    type: physical
  version: 1
public-keys: []"#;

        let meta: HetznerMetadata = serde_yaml::from_str(body).unwrap();
        let config = meta.network_config;

        assert_eq!(config.version, 1);
        assert_eq!(config.entries.len(), 1);

        let entry = &config.entries[0];
        assert_eq!(entry.name, "eth0");
        assert_eq!(entry.kind, EntryKind::Physical);
        assert_eq!(entry.mac_address, "96:00:00:2a:4f:11");
        assert_eq!(entry.subnets.len(), 2);

        assert_eq!(
            entry.subnets[0],
            Subnet {
                ipv4: true,
                kind: SubnetKind::Dhcp,
                ..Default::default()
            }
        );
        let v6 = &entry.subnets[1];
        assert!(v6.ipv6 && !v6.ipv4);
        assert_eq!(v6.kind, SubnetKind::Static);
        assert_eq!(v6.address.as_deref(), Some("2a01:4f9:c012:1234::1/64"));
        assert_eq!(v6.gateway.as_deref(), Some("fe80::1"));
        assert_eq!(
            v6.dns_nameservers,
            vec!["2a01:4ff:ff00::add:1", "2a01:4ff:ff00::add:2"]
        );
    }

    #[test]
    fn test_unknown_kinds() {
        let body = r#"network-config:
  version: 1
  config:
  - name: bond0
    type: bond
    subnets:
    - type: static6
"#;
        let meta: HetznerMetadata = serde_yaml::from_str(body).unwrap();
        let entry = &meta.network_config.entries[0];
        assert_eq!(entry.kind, EntryKind::Other);
        assert_eq!(entry.subnets[0].kind, SubnetKind::Other);
        assert_eq!(entry.mac_address, "");
    }

    #[test]
    fn test_missing_network_config() {
        let meta: HetznerMetadata = serde_yaml::from_str("hostname: foo").unwrap();
        assert_eq!(meta.network_config.version, 0);
        assert!(meta.network_config.entries.is_empty());
    }
}
