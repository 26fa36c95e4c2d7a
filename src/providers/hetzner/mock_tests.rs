use mockito;

use super::{EntryKind, HetznerProvider, HETZNER_METADATA_URL};
use crate::client::DEFAULT_TIMEOUT;

fn setup() -> (mockito::ServerGuard, HetznerProvider) {
    let server = mockito::Server::new();
    let provider = HetznerProvider::try_new(HETZNER_METADATA_URL, DEFAULT_TIMEOUT)
        .expect("create provider under test")
        .mock_base_url(server.url());
    (server, provider)
}

const ENDPOINT: &str = "/hetzner/v1/metadata";

#[test]
fn test_fetch_metadata() {
    let (mut server, provider) = setup();

    let body = r#"hostname: some-hostname
instance-id: 12345678
network-config:
  config:
  - mac_address: 96:00:00:aa:bb:cc
    name: eth0
    subnets:
    - ipv4: true
      type: dhcp
    type: physical
  version: 1
public-keys: []
vendor_data: "blah blah blah""#;

    let mock = server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body(body)
        .create();
    let meta = provider.fetch_metadata().unwrap();
    mock.assert();

    let entries = meta.network_config.entries;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::Physical);
    assert_eq!(entries[0].mac_address, "96:00:00:aa:bb:cc");
}

#[test]
fn test_fetch_not_found() {
    let (_server, provider) = setup();

    // Nothing registered on the mock server.
    let err = provider.fetch_metadata().unwrap_err();
    assert!(format!("{err:#}").contains("unexpected HTTP status"), "{err:#}");
}

#[test]
fn test_fetch_server_error() {
    let (mut server, provider) = setup();

    let mock = server.mock("GET", ENDPOINT).with_status(503).create();
    let err = provider.fetch_metadata().unwrap_err();
    mock.assert();
    assert!(format!("{err:#}").contains("503"), "{err:#}");
}

#[test]
fn test_fetch_bad_yaml() {
    let (mut server, provider) = setup();

    let mock = server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body("network-config: [unterminated")
        .create();
    let err = provider.fetch_metadata().unwrap_err();
    mock.assert();
    assert!(format!("{err:#}").contains("yaml"), "{err:#}");
}

#[test]
fn test_fetch_unknown_version() {
    let (mut server, provider) = setup();

    let mock = server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body("network-config:\n  version: 2\n  config: []\n")
        .create();
    let err = provider.fetch_metadata().unwrap_err();
    mock.assert();
    assert_eq!(err.to_string(), "unknown network-config version 2");
}

#[test]
fn test_fetch_missing_version() {
    let (mut server, provider) = setup();

    server
        .mock("GET", ENDPOINT)
        .with_status(200)
        .with_body("hostname: foo\n")
        .create();
    let err = provider.fetch_metadata().unwrap_err();
    assert_eq!(err.to_string(), "unknown network-config version 0");
}

#[test]
fn test_fetch_unreachable() {
    // Port 9 (discard) on localhost is not expected to accept connections.
    let provider = HetznerProvider::try_new("http://127.0.0.1:9/", DEFAULT_TIMEOUT).unwrap();
    let err = provider.fetch_metadata().unwrap_err();
    assert!(format!("{err:#}").contains("failed to fetch"), "{err:#}");
}
