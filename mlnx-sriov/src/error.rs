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

use crate::binding::ManifestError;
use crate::config::ConfigError;
use crate::discovery::DiscoveryError;
use crate::init::InitError;
use crate::metadata::MetadataError;
use crate::pci::RebindError;
use crate::provision::SriovError;

/// Exit code of a failed provisioning step.
pub const EXIT_SRIOV: i32 = 1;
pub const EXIT_METADATA: i32 = 2;
pub const EXIT_MANIFEST: i32 = 3;
pub const EXIT_DISCOVERY: i32 = 4;

#[derive(thiserror::Error, Debug)]
pub enum MlnxSriovError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    InitError(#[from] InitError),
    #[error(transparent)]
    MetadataError(#[from] MetadataError),
    #[error(transparent)]
    ManifestError(#[from] ManifestError),
    #[error(transparent)]
    DiscoveryError(#[from] DiscoveryError),
    #[error(transparent)]
    SriovError(#[from] SriovError),
    #[error(transparent)]
    RebindError(#[from] RebindError),
}

impl MlnxSriovError {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            MlnxSriovError::ConfigError(_) | MlnxSriovError::ManifestError(_) => {
                EXIT_MANIFEST
            }
            MlnxSriovError::InitError(_) | MlnxSriovError::SriovError(_) => {
                EXIT_SRIOV
            }
            MlnxSriovError::MetadataError(_) => EXIT_METADATA,
            MlnxSriovError::DiscoveryError(_) => EXIT_DISCOVERY,
            MlnxSriovError::RebindError(e) => match e.command_code() {
                Some(code) if code > 0 => code,
                _ => EXIT_SRIOV,
            },
        }
    }
}
