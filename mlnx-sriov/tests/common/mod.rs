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

#![allow(dead_code)]

use mlnx_sriov::config::Config;
use mlnx_sriov::metadata::ManifestSource;
use std::io::Write;
use tempfile::NamedTempFile;
use test_helpers::SysfsFixture;

/// InfiniBand address of a port with GUID 04bd700300374486.
pub const IB0_ADDRESS: &str =
    "80:00:02:08:fe:80:00:00:00:00:00:00:04:bd:70:03:00:37:44:86";
/// InfiniBand address of a port with GUID 04bd700300374487.
pub const IB1_ADDRESS: &str =
    "80:00:02:08:fe:80:00:00:00:00:00:00:04:bd:70:03:00:37:44:87";

pub const PF_PCI_ADDRESS: &str = "0000:81:00.0";
pub const VF_PCI_ADDRESS: &str = "0000:81:00.1";

pub fn vendor_data(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("vendor data tempfile");
    file.write_all(body.as_bytes()).expect("write vendor data");
    file
}

/// Config of a run against `sysfs`, reading vendor data from `vendor_data`.
pub fn config(sysfs: &SysfsFixture, vendor_data: &NamedTempFile) -> Config {
    Config {
        source: ManifestSource::File(vendor_data.path().to_path_buf()),
        sysfs_root: sysfs.root().to_path_buf(),
        log_file: None,
        ..Default::default()
    }
}

/// One Mellanox InfiniBand port with one VF on the PCI bus.
pub fn ib_host(totalvfs: u32, slots: usize) -> SysfsFixture {
    SysfsFixture::new()
        .with_net_device("ib0", "0x15b3", IB0_ADDRESS)
        .with_sriov("ib0", totalvfs, slots)
        .with_pci_device(PF_PCI_ADDRESS, "0x15b3", None)
        .with_pci_device(VF_PCI_ADDRESS, "0x15b3", Some(PF_PCI_ADDRESS))
        .with_driver("mlx5_core")
}
