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

use crate::guid::{Guid, GuidError};
use serde::Deserialize;

/// Top level of the vendor data document served by the metadata service.
/// Keys other than `mlnx_sriov` belong to other consumers and are ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct VendorData {
    #[serde(default)]
    pub mlnx_sriov: Option<SriovDetails>,
}

/// SR-IOV binding details exactly as they appear on the wire.
///
/// ```json
/// {
///     "enable_sriov": true,
///     "physical_guids": ["04bd700300374486", "04bd700300374487"],
///     "virtual_guids": [
///         ["fefeab03004f86b9", "fefe2b03002a5777"],
///         ["fefe6a03009db202", "fefe7d030069c502"]
///     ],
///     "default_limited_pkeys": ["0xBAD0", "0xF00D"],
///     "dynamic_pkey": "0x3e7e"
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SriovDetails {
    #[serde(default)]
    pub enable_sriov: bool,
    #[serde(default)]
    pub physical_guids: Vec<String>,
    #[serde(default)]
    pub virtual_guids: Vec<Vec<String>>,
    #[serde(default)]
    pub default_limited_pkeys: Vec<String>,
    #[serde(default)]
    pub dynamic_pkey: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error(
        "binding details list {physical} physical guids but {virtual_groups} virtual guid groups"
    )]
    LengthMismatch { physical: usize, virtual_groups: usize },
    #[error("invalid guid in {field}")]
    InvalidGuid { field: &'static str, source: GuidError },
}

/// One physical port and the virtual GUIDs of its VFs, in VF slot order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub physical_guid: Guid,
    pub virtual_guids: Vec<Guid>,
}

/// Validated SR-IOV binding manifest. Immutable for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub enable_sriov: bool,
    pub bindings: Vec<Binding>,
    pub default_limited_pkeys: Vec<String>,
    pub dynamic_pkey: Option<String>,
}

impl Manifest {
    /// The binding of `physical_guid`. The first entry wins if the manifest
    /// lists a physical GUID more than once.
    pub fn binding_for(&self, physical_guid: &Guid) -> Option<&Binding> {
        self.bindings.iter().find(|b| &b.physical_guid == physical_guid)
    }
}

impl TryFrom<SriovDetails> for Manifest {
    type Error = ManifestError;

    fn try_from(details: SriovDetails) -> Result<Self, Self::Error> {
        let SriovDetails {
            enable_sriov,
            physical_guids,
            virtual_guids,
            default_limited_pkeys,
            dynamic_pkey,
        } = details;

        if physical_guids.len() != virtual_guids.len() {
            return Err(ManifestError::LengthMismatch {
                physical: physical_guids.len(),
                virtual_groups: virtual_guids.len(),
            });
        }

        let bindings = physical_guids
            .iter()
            .zip(virtual_guids.iter())
            .map(|(physical, group)| {
                let physical_guid = Guid::parse(physical).map_err(|e| {
                    ManifestError::InvalidGuid {
                        field: "physical_guids",
                        source: e,
                    }
                })?;
                let virtual_guids = group
                    .iter()
                    .map(|guid| Guid::parse(guid))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| ManifestError::InvalidGuid {
                        field: "virtual_guids",
                        source: e,
                    })?;
                Ok(Binding { physical_guid, virtual_guids })
            })
            .collect::<Result<Vec<_>, ManifestError>>()?;

        Ok(Self { enable_sriov, bindings, default_limited_pkeys, dynamic_pkey })
    }
}
