/* -------------------------------------------------------------------------- *\
 *               Apache 2.0 License Copyright The Aurae Authors               *
 *                                                                            *
 *                +--------------------------------------------+              *
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 *                                                                            *
 * -------------------------------------------------------------------------- *
 *                                                                            *
 *   Licensed under the Apache License, Version 2.0 (the "License");          *
 *   you may not use this file except in compliance with the License.         *
 *   You may obtain a copy of the License at                                  *
 *                                                                            *
 *       http://www.apache.org/licenses/LICENSE-2.0                           *
 *                                                                            *
 *   Unless required by applicable law or agreed to in writing, software      *
 *   distributed under the License is distributed on an "AS IS" BASIS,        *
 *   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. *
 *   See the License for the specific language governing permissions and      *
 *   limitations under the License.                                           *
 *                                                                            *
\* -------------------------------------------------------------------------- */

//! Retrieval of the vendor data document carrying the SR-IOV bindings.

use crate::binding::VendorData;
use std::{
    fmt::{Display, Formatter},
    io,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{error, info};

/// OpenStack metadata service endpoint serving `vendor_data2.json`.
pub const VENDOR_DATA2_URL: &str =
    "http://169.254.169.254/openstack/2018-08-27/vendor_data2.json";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(thiserror::Error, Debug)]
pub enum MetadataError {
    #[error("Failed to reach metadata server {url}")]
    RequestFailure { url: String, source: reqwest::Error },
    #[error("Metadata server {url} failed to respond, status {status}")]
    StatusFailure { url: String, status: reqwest::StatusCode },
    #[error("Failed to read vendor data file {}", path.display())]
    ReadFileFailure { path: PathBuf, source: io::Error },
    #[error("Failed to load vendor data metadata")]
    DecodeFailure(#[from] serde_json::Error),
}

/// Where the vendor data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Url(String),
    File(PathBuf),
}

impl Default for ManifestSource {
    fn default() -> Self {
        Self::Url(VENDOR_DATA2_URL.to_owned())
    }
}

impl Display for ManifestSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestSource::Url(url) => url.fmt(f),
            ManifestSource::File(path) => path.display().fmt(f),
        }
    }
}

impl ManifestSource {
    pub async fn load(
        &self,
        timeout: Duration,
    ) -> Result<VendorData, MetadataError> {
        info!("Loading vendor data from {self}");
        match self {
            ManifestSource::Url(url) => fetch_vendor_data(url, timeout).await,
            ManifestSource::File(path) => load_vendor_data_file(path).await,
        }
    }
}

/// GET `url` and decode the vendor data document.
///
/// Proxies are bypassed, the metadata service is link-local.
pub async fn fetch_vendor_data(
    url: &str,
    timeout: Duration,
) -> Result<VendorData, MetadataError> {
    let request_failure = |e: reqwest::Error| {
        error!("Failed to reach metadata server. Reason: {e}");
        MetadataError::RequestFailure { url: url.to_owned(), source: e }
    };

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(timeout)
        .build()
        .map_err(request_failure)?;
    let response = client.get(url).send().await.map_err(request_failure)?;

    let status = response.status();
    if !status.is_success() {
        error!("Metadata server failed to respond. Error code: {status}");
        return Err(MetadataError::StatusFailure {
            url: url.to_owned(),
            status,
        });
    }

    let body = response.text().await.map_err(request_failure)?;
    parse_vendor_data(&body)
}

pub async fn load_vendor_data_file(
    path: &Path,
) -> Result<VendorData, MetadataError> {
    let body = tokio::fs::read_to_string(path).await.map_err(|e| {
        MetadataError::ReadFileFailure { path: path.to_path_buf(), source: e }
    })?;
    parse_vendor_data(&body)
}

pub fn parse_vendor_data(body: &str) -> Result<VendorData, MetadataError> {
    Ok(serde_json::from_str(body)?)
}
