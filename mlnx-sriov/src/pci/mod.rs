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

//! Rebinding of Mellanox virtual functions to their PCI driver.
//!
//! GUIDs written to `sriov/<k>/node` and `sriov/<k>/port` only become visible
//! to the upper layers once the VF's driver re-probes the device, so every
//! Mellanox VF is unbound from and bound to the driver again after all ports
//! have been provisioned.

use crate::cmd::CmdError;
use crate::discovery::MLNX_VENDOR_ID;
use crate::sysfs::DeviceTree;
use tracing::{error, info, warn};

mod lspci;

pub const DEFAULT_VF_DRIVER: &str = "mlx5_core";

const PCI_DEVICES: &str = "bus/pci/devices";
const PCI_DRIVERS: &str = "bus/pci/drivers";

#[derive(thiserror::Error, Debug)]
pub enum RebindError {
    #[error(transparent)]
    CmdError(#[from] CmdError),
    #[error("Failed to list virtual functions, `{command}` exited with {code}")]
    ListFailure { command: String, code: i32 },
}

impl RebindError {
    /// Exit code of the failing listing command, if there was one.
    pub fn command_code(&self) -> Option<i32> {
        match self {
            RebindError::CmdError(_) => None,
            RebindError::ListFailure { code, .. } => Some(*code),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebindReport {
    pub devices: usize,
    pub failed: usize,
}

/// PCI addresses of all Mellanox virtual functions, sorted.
///
/// Read from `bus/pci/devices`, where a VF is a device carrying a `physfn`
/// link to its physical function. `lspci` is only used if that directory
/// cannot be read.
pub async fn list_mellanox_vfs(
    tree: &dyn DeviceTree,
) -> Result<Vec<String>, RebindError> {
    let devices = match tree.list(PCI_DEVICES) {
        Ok(devices) => devices,
        Err(e) => {
            warn!("Can't list {PCI_DEVICES} ({e}), falling back to lspci");
            return lspci::list_mellanox_vfs().await;
        }
    };

    Ok(devices
        .into_iter()
        .filter(|addr| {
            tree.read(&format!("{PCI_DEVICES}/{addr}/vendor")).ok().as_deref()
                == Some(MLNX_VENDOR_ID)
                && tree.exists(&format!("{PCI_DEVICES}/{addr}/physfn"))
        })
        .collect())
}

/// Unbind and re-bind every Mellanox VF from `driver`.
///
/// A failure on one device is logged and does not stop the others.
pub async fn rebind_all_vfs(
    tree: &dyn DeviceTree,
    driver: &str,
) -> Result<RebindReport, RebindError> {
    info!("Rebinding SRIOV virtual functions now");

    let vfs = list_mellanox_vfs(tree).await?;
    let unbind = format!("{PCI_DRIVERS}/{driver}/unbind");
    let bind = format!("{PCI_DRIVERS}/{driver}/bind");

    let mut report = RebindReport::default();
    for pci_id in vfs {
        report.devices += 1;
        // a VF that is not bound yet fails to unbind but can still be bound
        let unbound = write_pci_id(tree, &unbind, &pci_id);
        let bound = write_pci_id(tree, &bind, &pci_id);
        if unbound && bound {
            info!("Rebound {pci_id} to {driver}");
        } else {
            report.failed += 1;
        }
    }

    Ok(report)
}

fn write_pci_id(tree: &dyn DeviceTree, control: &str, pci_id: &str) -> bool {
    match tree.write(control, pci_id) {
        Ok(()) => true,
        Err(e) => {
            error!(
                "Write {pci_id} > {control}, ret code: {}: {e}",
                e.raw_os_error().unwrap_or(-1)
            );
            false
        }
    }
}
