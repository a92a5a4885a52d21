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

//! Access to the kernel's device attribute tree.
//!
//! Everything the provisioner touches on the host is a sysfs attribute: it is
//! addressed by a path relative to the sysfs mount point and holds a single
//! line of text. [`DeviceTree`] models exactly that, which keeps discovery,
//! provisioning and rebinding testable against an in-memory tree.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Key/value view over device attributes. Keys are `/` separated paths
/// relative to the tree root, e.g. `class/net/ib0/address`.
pub trait DeviceTree {
    /// Names of the entries directly below `dir`, sorted.
    fn list(&self, dir: &str) -> io::Result<Vec<String>>;

    /// Attribute contents with surrounding whitespace removed.
    fn read(&self, attr: &str) -> io::Result<String>;

    /// Write `value` to an existing attribute. Attributes are never created.
    fn write(&self, attr: &str, value: &str) -> io::Result<()>;

    fn exists(&self, attr: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sysfs {
    root: PathBuf,
}

impl Sysfs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl Default for Sysfs {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl DeviceTree for Sysfs {
    fn list(&self, dir: &str) -> io::Result<Vec<String>> {
        let mut names = fs::read_dir(self.path(dir))?
            .map(|entry| {
                entry.map(|e| e.file_name().to_string_lossy().into_owned())
            })
            .collect::<io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    fn read(&self, attr: &str) -> io::Result<String> {
        fs::read_to_string(self.path(attr)).map(|s| s.trim().to_owned())
    }

    fn write(&self, attr: &str, value: &str) -> io::Result<()> {
        let mut file =
            OpenOptions::new().write(true).truncate(true).open(self.path(attr))?;
        file.write_all(value.as_bytes())
    }

    fn exists(&self, attr: &str) -> bool {
        // `physfn` and friends are symlinks; their presence is what matters
        fs::symlink_metadata(self.path(attr)).is_ok()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::DeviceTree;
    use std::{
        cell::RefCell,
        collections::{BTreeMap, BTreeSet},
        io,
    };

    /// In-memory device tree that records every write attempt in order.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryTree {
        attrs: RefCell<BTreeMap<String, String>>,
        failing: BTreeSet<String>,
        writes: RefCell<Vec<(String, String)>>,
    }

    impl MemoryTree {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn with(self, attr: &str, value: &str) -> Self {
            let _ = self.attrs.borrow_mut().insert(attr.into(), value.into());
            self
        }

        /// Writes to `attr` fail with `EIO`.
        pub(crate) fn failing(mut self, attr: &str) -> Self {
            let _ = self.failing.insert(attr.into());
            self
        }

        pub(crate) fn writes(&self) -> Vec<(String, String)> {
            self.writes.borrow().clone()
        }

        pub(crate) fn value(&self, attr: &str) -> Option<String> {
            self.attrs.borrow().get(attr).cloned()
        }
    }

    impl DeviceTree for MemoryTree {
        fn list(&self, dir: &str) -> io::Result<Vec<String>> {
            let prefix = format!("{dir}/");
            let names: BTreeSet<String> = self
                .attrs
                .borrow()
                .keys()
                .filter_map(|key| key.strip_prefix(&prefix))
                .filter_map(|rest| rest.split('/').next())
                .map(str::to_owned)
                .collect();
            if names.is_empty() {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            Ok(names.into_iter().collect())
        }

        fn read(&self, attr: &str) -> io::Result<String> {
            self.value(attr)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }

        fn write(&self, attr: &str, value: &str) -> io::Result<()> {
            self.writes.borrow_mut().push((attr.into(), value.into()));
            if self.failing.contains(attr) {
                return Err(io::Error::from_raw_os_error(5));
            }
            let _ = self.attrs.borrow_mut().insert(attr.into(), value.into());
            Ok(())
        }

        fn exists(&self, attr: &str) -> bool {
            let prefix = format!("{attr}/");
            let attrs = self.attrs.borrow();
            attrs.contains_key(attr)
                || attrs.keys().any(|key| key.starts_with(&prefix))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sysfs_reads_trimmed_attributes() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("class/net/ib0/device"))
            .expect("create device dir");
        fs::write(dir.path().join("class/net/ib0/device/vendor"), "0x15b3\n")
            .expect("write vendor");

        let sysfs = Sysfs::new(dir.path());
        assert_eq!(sysfs.read("class/net/ib0/device/vendor").unwrap(), "0x15b3");
        assert_eq!(sysfs.list("class/net").unwrap(), vec!["ib0".to_owned()]);
        assert!(sysfs.exists("class/net/ib0/device"));
        assert!(!sysfs.exists("class/net/ib1"));
    }

    #[test]
    fn sysfs_write_does_not_create_attributes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sysfs = Sysfs::new(dir.path());

        let err = sysfs.write("sriov_numvfs", "1").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!sysfs.exists("sriov_numvfs"));
    }

    #[test]
    fn sysfs_write_replaces_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("sriov_numvfs"), "16").expect("seed attr");

        let sysfs = Sysfs::new(dir.path());
        sysfs.write("sriov_numvfs", "2").unwrap();
        assert_eq!(sysfs.read("sriov_numvfs").unwrap(), "2");
    }

    #[test]
    fn memory_tree_lists_immediate_children() {
        let tree = testing::MemoryTree::new()
            .with("class/net/ib0/address", "a")
            .with("class/net/ib0/device/vendor", "0x15b3")
            .with("class/net/eth0/address", "b");

        assert_eq!(
            tree.list("class/net").unwrap(),
            vec!["eth0".to_owned(), "ib0".to_owned()]
        );
        assert!(tree.exists("class/net/ib0/device"));
        assert!(tree.list("bus/pci/devices").is_err());
    }
}
