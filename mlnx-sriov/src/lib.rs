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

//! Boot-time provisioning of SR-IOV virtual functions on Mellanox InfiniBand
//! ports.
//!
//! The OpenStack metadata service hands every bare metal node a list of
//! bindings, each pairing one physical port GUID with the GUIDs of the
//! virtual functions that port should carry. On boot `mlnx-sriov`
//!
//! 1. loads those bindings once from the metadata service (or a file),
//! 2. finds the local Mellanox ports in sysfs,
//! 3. creates the VFs of each bound port and writes their GUIDs,
//! 4. rebinds all Mellanox VFs to their driver so the GUIDs take effect.
//!
//! VF configuration does not survive a reboot, so this runs on every boot.
// Lint groups: https://doc.rust-lang.org/rustc/lints/groups.html
#![warn(future_incompatible, nonstandard_style, unused)]
#![warn(
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    unconditional_recursion,
    unused_comparisons,
    while_true
)]
#![warn(missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_results
)]
#![warn(clippy::unwrap_used)]

pub use self::error::MlnxSriovError;

use crate::binding::{resolve_vf_assignments, Manifest, Resolution};
use crate::config::Config;
use crate::discovery::list_local_mellanox_interfaces;
use crate::pci::{rebind_all_vfs, RebindReport};
use crate::provision::{provision_vfs, ProvisionReport};
use crate::sysfs::{DeviceTree, Sysfs};
use tracing::{error, info};

pub mod binding;
pub mod cmd;
pub mod config;
pub mod discovery;
pub mod error;
pub mod guid;
pub mod init;
pub mod metadata;
pub mod pci;
pub mod provision;
pub mod sysfs;

pub const EXIT_OKAY: i32 = 0;
pub const EXIT_ERROR: i32 = 1;

/// What one run did to the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Mellanox interfaces found.
    pub interfaces: usize,
    pub provisioned: usize,
    pub skipped: usize,
    /// Interfaces whose VF count could not be written, or that were given
    /// up on with `continue_on_error`.
    pub failed: usize,
    pub vfs: usize,
    pub writes: usize,
    pub failed_writes: usize,
    /// None if the vendor data held no binding details.
    pub rebind: Option<RebindReport>,
}

impl RunSummary {
    fn record(&mut self, report: ProvisionReport) {
        if report.activated {
            self.provisioned += 1;
        } else {
            self.failed += 1;
        }
        self.vfs += report.vfs;
        self.writes += report.writes;
        self.failed_writes += report.failed_writes;
    }
}

/// Provision this host as described by the vendor data of `config.source`.
pub async fn run(config: &Config) -> Result<RunSummary, MlnxSriovError> {
    let vendor_data = config.source.load(config.fetch_timeout).await?;
    let Some(details) = vendor_data.mlnx_sriov else {
        info!("No sriov binding details returned.");
        return Ok(RunSummary::default());
    };
    let manifest = Manifest::try_from(details)?;

    let tree = Sysfs::new(&config.sysfs_root);
    provision_host(&tree, &manifest, &config.driver, config.continue_on_error)
        .await
}

/// Create and configure the VFs of every bound Mellanox port in `tree`,
/// then rebind all Mellanox VFs to `driver`.
///
/// A port whose VF count cannot be written is counted as failed and the
/// run moves on. The first capacity error aborts the run unless
/// `continue_on_error` is set, in which case the failing port is skipped,
/// the rebind still happens and the first error is returned afterwards.
pub async fn provision_host(
    tree: &dyn DeviceTree,
    manifest: &Manifest,
    driver: &str,
    continue_on_error: bool,
) -> Result<RunSummary, MlnxSriovError> {
    info!(
        "SR-IOV binding details: enable_sriov {}, {} bindings, default limited pkeys {:?}, dynamic pkey {:?}",
        manifest.enable_sriov,
        manifest.bindings.len(),
        manifest.default_limited_pkeys,
        manifest.dynamic_pkey
    );

    let interfaces = list_local_mellanox_interfaces(tree)?;

    let mut summary =
        RunSummary { interfaces: interfaces.len(), ..Default::default() };
    let mut first_error = None;
    for iface in &interfaces {
        let assignments = match resolve_vf_assignments(iface, manifest) {
            Resolution::Skip(reason) => {
                info!("{reason}, skip IF {}.", iface.name);
                summary.skipped += 1;
                continue;
            }
            Resolution::Provision(assignments) => assignments,
        };
        info!(
            "Pending created SRIOV ports on {} have virtual guids: {}",
            iface.name,
            assignments
                .iter()
                .map(|a| a.node_guid.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        match provision_vfs(tree, iface, &assignments) {
            Ok(report) => summary.record(report),
            Err(e) if continue_on_error => {
                error!("{e}, continuing with the next interface");
                summary.failed += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(e) => {
                error!("{e}");
                return Err(e.into());
            }
        }
    }

    summary.rebind = Some(rebind_all_vfs(tree, driver).await?);
    info!(
        "Provisioned {} of {} Mellanox interfaces with {} VFs, {} failed writes",
        summary.provisioned,
        summary.interfaces,
        summary.vfs,
        summary.failed_writes
    );

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(summary),
    }
}
