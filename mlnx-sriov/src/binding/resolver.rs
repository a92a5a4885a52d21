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

use super::manifest::Manifest;
use crate::discovery::LocalInterface;
use crate::guid::Guid;
use std::fmt::{Display, Formatter};

/// The GUIDs one VF slot of an interface is to receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfAssignment {
    pub iface: String,
    /// Position in the binding's virtual GUID list and the sysfs VF slot.
    pub vf_index: usize,
    pub node_guid: Guid,
    pub port_guid: Guid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    SriovDisabled,
    InvalidGuid,
    NotInBinding,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::SriovDisabled => {
                f.write_str("SR-IOV is not enabled in the binding details")
            }
            SkipReason::InvalidGuid => {
                f.write_str("address is not a valid Mellanox GUID")
            }
            SkipReason::NotInBinding => {
                f.write_str("physical guid is not part of this binding")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// VFs to create, ordered by `vf_index`.
    Provision(Vec<VfAssignment>),
    Skip(SkipReason),
}

/// Decide which VFs `iface` gets according to `manifest`.
pub fn resolve_vf_assignments(
    iface: &LocalInterface,
    manifest: &Manifest,
) -> Resolution {
    if !manifest.enable_sriov {
        return Resolution::Skip(SkipReason::SriovDisabled);
    }
    let Some(guid) = &iface.guid else {
        return Resolution::Skip(SkipReason::InvalidGuid);
    };
    let Some(binding) = manifest.binding_for(guid) else {
        return Resolution::Skip(SkipReason::NotInBinding);
    };

    Resolution::Provision(
        binding
            .virtual_guids
            .iter()
            .enumerate()
            .map(|(vf_index, virtual_guid)| VfAssignment {
                iface: iface.name.clone(),
                vf_index,
                node_guid: virtual_guid.clone(),
                port_guid: virtual_guid.clone(),
            })
            .collect(),
    )
}
