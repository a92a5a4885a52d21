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

//! A throwaway sysfs tree for integration tests.
//!
//! Lays out the attributes the provisioner reads and writes as plain files
//! under a temporary directory, which is removed when the fixture drops.
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

use std::{
    fs,
    os::unix::fs::symlink,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

#[derive(Debug)]
pub struct SysfsFixture {
    dir: TempDir,
}

impl Default for SysfsFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl SysfsFixture {
    /// An empty tree with `class/net` and `bus/pci/devices` present.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create sysfs tempdir");
        for sub in ["class/net", "bus/pci/devices"] {
            fs::create_dir_all(dir.path().join(sub))
                .expect("failed to create sysfs dir");
        }
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, key: &str) -> PathBuf {
        self.root().join(key)
    }

    /// Create or overwrite the attribute `key`.
    pub fn with_attr(self, key: &str, value: &str) -> Self {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create attr dir");
        }
        fs::write(&path, value).expect("failed to write attr");
        self
    }

    /// A network interface whose PCI device reports `vendor`.
    pub fn with_net_device(
        self,
        name: &str,
        vendor: &str,
        address: &str,
    ) -> Self {
        let iface = format!("class/net/{name}");
        self.with_attr(&format!("{iface}/address"), &format!("{address}\n"))
            .with_attr(&format!("{iface}/device/vendor"), &format!("{vendor}\n"))
    }

    /// SR-IOV attributes of interface `name`: a capacity of `totalvfs`, no
    /// VFs enabled, and `slots` VF slot directories with empty attributes.
    ///
    /// The kernel only creates the slots once VFs are enabled; pre-creating
    /// them stands in for that.
    pub fn with_sriov(self, name: &str, totalvfs: u32, slots: usize) -> Self {
        let device = format!("class/net/{name}/device");
        let totalvfs = format!("{totalvfs}\n");
        let mut fixture = self
            .with_attr(&format!("{device}/sriov_totalvfs"), &totalvfs)
            .with_attr(&format!("{device}/sriov_numvfs"), "0\n");
        for slot in 0..slots {
            for attr in ["policy", "node", "port"] {
                let key = format!("{device}/sriov/{slot}/{attr}");
                fixture = fixture.with_attr(&key, "");
            }
        }
        fixture
    }

    /// A PCI device. With `physfn` set the device is a virtual function of
    /// the physical function at that address.
    pub fn with_pci_device(
        self,
        address: &str,
        vendor: &str,
        physfn: Option<&str>,
    ) -> Self {
        let device = format!("bus/pci/devices/{address}");
        let fixture =
            self.with_attr(&format!("{device}/vendor"), &format!("{vendor}\n"));
        if let Some(physfn) = physfn {
            let link = fixture.path(&format!("{device}/physfn"));
            symlink(format!("../{physfn}"), link)
                .expect("failed to link physfn");
        }
        fixture
    }

    /// `bind` and `unbind` control files of a PCI driver.
    pub fn with_driver(self, driver: &str) -> Self {
        let driver = format!("bus/pci/drivers/{driver}");
        self.with_attr(&format!("{driver}/bind"), "")
            .with_attr(&format!("{driver}/unbind"), "")
    }

    /// Attribute contents with surrounding whitespace removed.
    pub fn read(&self, key: &str) -> String {
        fs::read_to_string(self.path(key))
            .unwrap_or_else(|e| panic!("failed to read {key}: {e}"))
            .trim()
            .to_owned()
    }

    pub fn exists(&self, key: &str) -> bool {
        fs::symlink_metadata(self.path(key)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lays_out_an_infiniband_port() {
        let sysfs = SysfsFixture::new()
            .with_net_device("ib0", "0x15b3", "80:00:02:08")
            .with_sriov("ib0", 8, 2);

        assert_eq!(sysfs.read("class/net/ib0/device/vendor"), "0x15b3");
        assert_eq!(sysfs.read("class/net/ib0/device/sriov_numvfs"), "0");
        assert!(sysfs.exists("class/net/ib0/device/sriov/1/port"));
        assert!(!sysfs.exists("class/net/ib0/device/sriov/2"));
    }

    #[test]
    fn virtual_function_links_to_its_physical_function() {
        let sysfs = SysfsFixture::new()
            .with_pci_device("0000:81:00.0", "0x15b3", None)
            .with_pci_device("0000:81:00.1", "0x15b3", Some("0000:81:00.0"));

        assert!(!sysfs.exists("bus/pci/devices/0000:81:00.0/physfn"));
        assert!(sysfs.exists("bus/pci/devices/0000:81:00.1/physfn"));
    }

    #[test]
    fn tree_is_removed_on_drop() {
        let sysfs = SysfsFixture::new();
        let root = sysfs.root().to_path_buf();
        drop(sysfs);
        assert!(!root.exists());
    }
}
