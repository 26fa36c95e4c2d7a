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

//! client
//!
//! this is a thin layer over a blocking http get request. a request is
//! attempted exactly once, bounded by a timeout, and a successful response
//! body is deserialized with a pluggable deserializer. nothing is retried;
//! re-invocation is up to the boot stage supervisor.

use std::io::Read;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::{self, blocking, header, Method};
use slog_scope::{debug, info};

/// Default timeout for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub trait Deserializer {
    fn deserialize<T, R>(&self, r: R) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
        R: Read;
    fn content_type(&self) -> header::HeaderValue;
}

#[derive(Debug, Clone, Copy)]
pub struct Yaml;

impl Deserializer for Yaml {
    fn deserialize<T, R>(&self, mut r: R) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
        R: Read,
    {
        let mut body = String::new();
        r.read_to_string(&mut body)
            .context("failed to read response body")?;
        serde_yaml::from_str(&body).context("failed yaml deserialization")
    }

    fn content_type(&self) -> header::HeaderValue {
        header::HeaderValue::from_static("application/yaml")
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    client: blocking::Client,
    timeout: Duration,
    #[cfg(test)]
    mock_base_url: Option<String>,
}

impl Client {
    pub fn try_new(timeout: Duration) -> Result<Self> {
        let client = blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to initialize client")?;
        Ok(Client {
            client,
            timeout,
            #[cfg(test)]
            mock_base_url: None,
        })
    }

    #[cfg(test)]
    pub fn mock_base_url(mut self, base_url: String) -> Self {
        self.mock_base_url = Some(base_url);
        self
    }

    pub fn get<D>(&self, d: D, url: String) -> RequestBuilder<D>
    where
        D: Deserializer,
    {
        RequestBuilder {
            url,
            d,
            client: self.client.clone(),
            timeout: self.timeout,
            #[cfg(test)]
            mock_base_url: self.mock_base_url.clone(),
        }
    }
}

pub struct RequestBuilder<D>
where
    D: Deserializer,
{
    url: String,
    d: D,
    client: blocking::Client,
    timeout: Duration,
    #[cfg(test)]
    mock_base_url: Option<String>,
}

impl<D> RequestBuilder<D>
where
    D: Deserializer,
{
    /// Perform a single GET and deserialize the body of a `200 OK` response.
    pub fn send<T>(self) -> Result<T>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = self.parse_url()?;
        let mut req = blocking::Request::new(Method::GET, url);
        req.headers_mut()
            .insert(header::ACCEPT, self.d.content_type());

        info!("Fetching {} (timeout {}s)", req.url(), self.timeout.as_secs());
        let resp = self
            .client
            .execute(req)
            .map_err(|e| anyhow!(e).context("failed to fetch"))?;

        match resp.status() {
            reqwest::StatusCode::OK => {
                debug!("Fetch successful");
                self.d.deserialize(resp)
            }
            s => bail!("unexpected HTTP status {}", s),
        }
    }

    fn parse_url(&self) -> Result<reqwest::Url> {
        #[allow(unused_mut)]
        let mut url = reqwest::Url::parse(self.url.as_str()).context("failed to parse uri")?;
        #[cfg(test)]
        if let Some(mock_base_url) = &self.mock_base_url {
            let base_url =
                reqwest::Url::parse(mock_base_url).context("failed to parse mock base URL")?;
            url.set_scheme(base_url.scheme())
                .map_err(|_| anyhow!("failed to update URL scheme"))?;
            let host = base_url
                .host()
                .context("mock base URL doesn't have a host")?
                .to_string();
            url.set_host(Some(&host))
                .context("failed to update URL host")?;
            url.set_port(base_url.port())
                .map_err(|_| anyhow!("failed to update URL port"))?;
        }
        Ok(url)
    }
}
