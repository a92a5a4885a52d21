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

//! Discovery of local Mellanox network interfaces.

use crate::guid::Guid;
use crate::sysfs::DeviceTree;
use std::io;
use tracing::{debug, info};

pub const MLNX_VENDOR_ID: &str = "0x15b3";

const NET_CLASS: &str = "class/net";

#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to list network interfaces under {dir}")]
    ListInterfacesFailure { dir: String, source: io::Error },
}

/// A Mellanox network interface found on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInterface {
    pub name: String,
    pub vendor_id: String,
    pub address: String,
    /// `None` if `address` is not an InfiniBand address.
    pub guid: Option<Guid>,
    /// Raw `sriov_totalvfs`, `None` if the device does not expose it.
    pub sriov_totalvfs: Option<String>,
}

impl LocalInterface {
    /// Key of an attribute of the interface's PCI device.
    pub fn device_attr(&self, field: &str) -> String {
        format!("{NET_CLASS}/{}/device/{field}", self.name)
    }
}

/// List the Mellanox interfaces of the host, sorted by name.
///
/// Interfaces with an unreadable vendor id or hardware address are skipped.
pub fn list_local_mellanox_interfaces(
    tree: &dyn DeviceTree,
) -> Result<Vec<LocalInterface>, DiscoveryError> {
    let names = tree.list(NET_CLASS).map_err(|e| {
        DiscoveryError::ListInterfacesFailure {
            dir: NET_CLASS.to_owned(),
            source: e,
        }
    })?;

    let mut interfaces = Vec::new();
    for name in names {
        let Some(vendor_id) = get_device_info(tree, &name, "device/vendor")
        else {
            continue;
        };
        if vendor_id != MLNX_VENDOR_ID {
            info!("Interface {name} is not a Mellanox port, skip.");
            continue;
        }
        info!("Interface {name} is a Mellanox port, processing now.");

        let Some(address) = get_device_info(tree, &name, "address") else {
            continue;
        };
        let guid = Guid::from_address(&address);
        info!(
            "IF {name}'s address is: {address}, guid is: {}",
            guid.as_deref().unwrap_or("<none>")
        );

        let sriov_totalvfs =
            get_device_info(tree, &name, "device/sriov_totalvfs");

        interfaces.push(LocalInterface {
            name,
            vendor_id,
            address,
            guid,
            sriov_totalvfs,
        });
    }

    debug!("Found {} Mellanox interfaces", interfaces.len());
    Ok(interfaces)
}

fn get_device_info(
    tree: &dyn DeviceTree,
    iface: &str,
    field: &str,
) -> Option<String> {
    match tree.read(&format!("{NET_CLASS}/{iface}/{field}")) {
        Ok(value) => Some(value),
        Err(e) => {
            info!("Can't find field {field} for device {iface}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::testing::MemoryTree;
    use pretty_assertions::assert_eq;

    const IB_ADDRESS: &str =
        "ff:00:00:00:00:00:02:00:00:02:c9:00:04:bd:70:03:00:37:44:86";

    #[test]
    fn lists_only_mellanox_interfaces() {
        let tree = MemoryTree::new()
            .with("class/net/eth0/address", "52:54:00:12:34:56")
            .with("class/net/eth0/device/vendor", "0x8086")
            .with("class/net/ib0/address", IB_ADDRESS)
            .with("class/net/ib0/device/vendor", "0x15b3")
            .with("class/net/ib0/device/sriov_totalvfs", "8")
            .with("class/net/lo/address", "00:00:00:00:00:00");

        let interfaces = list_local_mellanox_interfaces(&tree).unwrap();

        assert_eq!(
            interfaces,
            vec![LocalInterface {
                name: "ib0".into(),
                vendor_id: "0x15b3".into(),
                address: IB_ADDRESS.into(),
                guid: Some(Guid::parse("04bd700300374486").unwrap()),
                sriov_totalvfs: Some("8".into()),
            }]
        );
    }

    #[test]
    fn missing_capacity_is_recorded_not_fatal() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/address", IB_ADDRESS)
            .with("class/net/ib0/device/vendor", "0x15b3");

        let interfaces = list_local_mellanox_interfaces(&tree).unwrap();

        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].sriov_totalvfs, None);
    }

    #[test]
    fn mellanox_ethernet_port_has_no_guid() {
        let tree = MemoryTree::new()
            .with("class/net/enp1s0/address", "b8:59:9f:12:34:56")
            .with("class/net/enp1s0/device/vendor", "0x15b3");

        let interfaces = list_local_mellanox_interfaces(&tree).unwrap();

        assert_eq!(interfaces[0].guid, None);
    }

    #[test]
    fn unreadable_address_skips_interface() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/vendor", "0x15b3")
            .with("class/net/ib1/address", IB_ADDRESS)
            .with("class/net/ib1/device/vendor", "0x15b3");

        let interfaces = list_local_mellanox_interfaces(&tree).unwrap();

        let names: Vec<_> = interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["ib1"]);
    }

    #[test]
    fn enumeration_is_restartable() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/address", IB_ADDRESS)
            .with("class/net/ib0/device/vendor", "0x15b3");

        assert_eq!(
            list_local_mellanox_interfaces(&tree).unwrap(),
            list_local_mellanox_interfaces(&tree).unwrap()
        );
    }

    #[test]
    fn missing_net_class_is_an_error() {
        let tree = MemoryTree::new();
        assert!(matches!(
            list_local_mellanox_interfaces(&tree),
            Err(DiscoveryError::ListInterfacesFailure { .. })
        ));
    }

    #[test]
    fn device_attr_points_at_pci_device() {
        let iface = LocalInterface {
            name: "ib0".into(),
            vendor_id: MLNX_VENDOR_ID.into(),
            address: IB_ADDRESS.into(),
            guid: None,
            sriov_totalvfs: None,
        };
        assert_eq!(
            iface.device_attr("sriov_numvfs"),
            "class/net/ib0/device/sriov_numvfs"
        );
    }
}
