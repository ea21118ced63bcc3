//
// Copyright (c) tsfdb contributors
// See License.txt for details
use std::time::Duration;

use eyre::{eyre, Result};
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::Config;

/// Client to `tsfdbd`'s localhost HTTP API.
pub struct TsfdbClient {
    base_url: String,
    client: Client,
}

impl TsfdbClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            base_url: format!("http://{}", config.http_addr),
        })
    }

    pub fn write(&self, batch_text: &str) -> Result<()> {
        let r = self
            .client
            .post(format!("{}/write", self.base_url))
            .body(batch_text.to_string())
            .send()?;
        if r.status().is_success() {
            Ok(())
        } else {
            Err(eyre!("write failed: HTTP {} {}", r.status().as_u16(), r.text().unwrap_or_default()))
        }
    }

    pub fn fetch(&self, path: &str, start: &str, stop: &str, step: &str) -> Result<Value> {
        let r = self
            .client
            .get(format!("{}/fetch", self.base_url))
            .query(&[("path", path), ("start", start), ("stop", stop), ("step", step)])
            .send()?;
        if r.status().is_success() {
            Ok(r.json()?)
        } else {
            Err(eyre!("fetch failed: HTTP {} {}", r.status().as_u16(), r.text().unwrap_or_default()))
        }
    }
}
