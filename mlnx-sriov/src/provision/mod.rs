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

//! Creation of SR-IOV virtual functions on a physical InfiniBand port.
//!
//! Per interface the provisioner checks the firmware's VF capacity, enables
//! the VFs, and then writes policy, node GUID and port GUID of every VF slot
//! in ascending order. The slot directories `sriov/<k>` only exist once the
//! VF count has been written, so the order of writes matters.
//!
//! Capacity failures are returned as errors. Writes are best effort: a
//! failure is logged and counted and the remaining writes still happen. If
//! the VF count itself cannot be written the port has no VF slots, so its
//! slot writes are skipped.

pub use self::sriov::SriovError;

use crate::binding::VfAssignment;
use crate::discovery::LocalInterface;
use crate::sysfs::DeviceTree;
use tracing::{error, info};

mod sriov;

/// Forwarding policy of a VF: follow the state of the physical port.
pub const VF_POLICY_FOLLOW: &str = "Follow";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionReport {
    /// False if the VF count could not be written.
    pub activated: bool,
    pub vfs: usize,
    /// Successful VF slot writes.
    pub writes: usize,
    /// Failed VF slot and VF count writes.
    pub failed_writes: usize,
}

impl ProvisionReport {
    fn record(&mut self, ok: bool) {
        if ok {
            self.writes += 1;
        } else {
            self.failed_writes += 1;
        }
    }
}

/// Create one VF on `iface` per assignment and give each its GUIDs.
///
/// `assignments` must be ordered by `vf_index`, as produced by
/// [`crate::binding::resolve_vf_assignments`].
pub fn provision_vfs(
    tree: &dyn DeviceTree,
    iface: &LocalInterface,
    assignments: &[VfAssignment],
) -> Result<ProvisionReport, SriovError> {
    let required = assignments.len();
    let total = sriov::check_capacity(iface, required)?;
    info!("Creating {required} of {total} possible VFs on {}", iface.name);

    let mut report = ProvisionReport::default();
    if !sriov::set_num_vfs(tree, iface, required) {
        report.record(false);
        error!("No VFs on {}, skip its VF settings", iface.name);
        return Ok(report);
    }

    report.activated = true;
    report.vfs = required;
    for assignment in assignments {
        let slot =
            iface.device_attr(&format!("sriov/{}", assignment.vf_index));

        report.record(write_attr(
            tree,
            &format!("{slot}/policy"),
            VF_POLICY_FOLLOW,
        ));
        report.record(write_attr(
            tree,
            &format!("{slot}/node"),
            &assignment.node_guid.to_sysfs(),
        ));
        report.record(write_attr(
            tree,
            &format!("{slot}/port"),
            &assignment.port_guid.to_sysfs(),
        ));
    }

    Ok(report)
}

fn write_attr(tree: &dyn DeviceTree, attr: &str, value: &str) -> bool {
    match tree.write(attr, value) {
        Ok(()) => {
            info!("Write {value} > {attr}, ret code: 0");
            true
        }
        Err(e) => {
            error!(
                "Write {value} > {attr}, ret code: {}: {e}",
                e.raw_os_error().unwrap_or(-1)
            );
            false
        }
    }
}
