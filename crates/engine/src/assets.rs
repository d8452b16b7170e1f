// EDP - EVM Deployment Pipeline
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! External asset listings.
//!
//! Assets are the files of an IPFS directory. Each file becomes one batch item
//! named after the file (without extension) and pointing at its gateway URL.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::AssetDirectoryError;

/// Level every asset starts at; the directory listing carries no level
pub const INITIAL_ASSET_LEVEL: u32 = 1;

/// One item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAsset {
    /// Display name, the file name without its last extension
    pub name: String,
    /// Always [`INITIAL_ASSET_LEVEL`]
    pub level: u32,
    /// Link to the asset image
    pub image_uri: String,
}

impl ExternalAsset {
    /// Asset at the initial level.
    pub fn new(name: impl Into<String>, image_uri: impl Into<String>) -> Self {
        Self { name: name.into(), level: INITIAL_ASSET_LEVEL, image_uri: image_uri.into() }
    }
}

/// Strip the last extension from a file name: `"pikachu.png"` -> `"pikachu"`.
///
/// A name without a dot is returned unchanged.
pub fn asset_name(file_name: &str) -> &str {
    file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem)
}

/// A source of asset listings.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// List the assets of `directory`, in listing order.
    async fn list(&self, directory: &str) -> Result<Vec<ExternalAsset>, AssetDirectoryError>;
}

/// Lists directories through the IPFS HTTP API.
#[derive(Debug, Clone)]
pub struct IpfsDirectory {
    client: reqwest::Client,
    api_url: String,
    gateway_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsResponse {
    objects: Vec<LsObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsObject {
    #[serde(default)]
    links: Vec<LsLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LsLink {
    name: String,
    hash: String,
}

impl IpfsDirectory {
    /// Client for the API at `api_url`, building image links under `gateway_url`.
    pub fn new(api_url: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn ls_endpoint(&self) -> String {
        format!("{}/api/v0/ls", self.api_url)
    }
}

#[async_trait]
impl AssetDirectory for IpfsDirectory {
    async fn list(&self, directory: &str) -> Result<Vec<ExternalAsset>, AssetDirectoryError> {
        debug!(directory, api = %self.api_url, "listing asset directory");

        // The IPFS RPC API only accepts POST
        let response = self
            .client
            .post(self.ls_endpoint())
            .query(&[("arg", directory)])
            .send()
            .await
            .map_err(|e| AssetDirectoryError::Http(e.to_string()))?
            .error_for_status()
            .map_err(|e| AssetDirectoryError::Http(e.to_string()))?;

        let listing: LsResponse =
            response.json().await.map_err(|e| AssetDirectoryError::Malformed(e.to_string()))?;

        let object = listing.objects.into_iter().next().ok_or_else(|| {
            AssetDirectoryError::Malformed(format!("no object listed for `{directory}`"))
        })?;

        let assets: Vec<_> = object
            .links
            .into_iter()
            .map(|link| {
                ExternalAsset::new(
                    asset_name(&link.name),
                    format!("{}/{}", self.gateway_url, link.hash),
                )
            })
            .collect();

        info!(directory, count = assets.len(), "listed assets");
        Ok(assets)
    }
}
