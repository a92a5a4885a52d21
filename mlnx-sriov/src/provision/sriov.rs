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

use super::write_attr;
use crate::discovery::LocalInterface;
use crate::sysfs::DeviceTree;
use tracing::{error, info};

#[derive(thiserror::Error, Debug)]
pub enum SriovError {
    #[error("SR-IOV is not enabled on Mellanox firmware of {iface}")]
    MissingCapabilities { iface: String },
    #[error(
        "SR-IOV is not enabled on Mellanox firmware of {iface}, failed to parse sriov_totalvfs {capabilities:?}"
    )]
    ParseCapabilitiesFailure { iface: String, capabilities: String },
    #[error(
        "SR-IOV total VFs number {total} of {iface} is less than required amount {required}"
    )]
    InsufficientCapacity { iface: String, total: u32, required: usize },
}

/// Make sure `iface` can hold `required` VFs. Returns the VF capacity.
pub(crate) fn check_capacity(
    iface: &LocalInterface,
    required: usize,
) -> Result<u32, SriovError> {
    let Some(sriov_totalvfs) = &iface.sriov_totalvfs else {
        return Err(SriovError::MissingCapabilities {
            iface: iface.name.clone(),
        });
    };

    // plain decimal only, `parse` would also take a leading '+'
    let capabilities = sriov_totalvfs.trim_end();
    let total = capabilities
        .chars()
        .all(|c| c.is_ascii_digit())
        .then(|| capabilities.parse::<u32>().ok())
        .flatten()
        .ok_or_else(|| SriovError::ParseCapabilitiesFailure {
            iface: iface.name.clone(),
            capabilities: sriov_totalvfs.clone(),
        })?;

    if required > total as usize {
        return Err(SriovError::InsufficientCapacity {
            iface: iface.name.clone(),
            total,
            required,
        });
    }
    Ok(total)
}

/// Enable `num` VFs on `iface`. Returns false if the count could not be
/// written, in which case none of the VF slots exist.
///
/// Changing the number of VFs is non-persistent and does not survive a
/// reboot. The kernel refuses to change a non-zero VF count to another
/// non-zero count, so an existing different count is reset to 0 first.
pub(crate) fn set_num_vfs(
    tree: &dyn DeviceTree,
    iface: &LocalInterface,
    num: usize,
) -> bool {
    let sriov_numvfs = iface.device_attr("sriov_numvfs");

    let current = tree
        .read(&sriov_numvfs)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    if current != 0 && current != num {
        info!("Resetting {current} VFs of {} before setting {num}", iface.name);
        if !write_attr(tree, &sriov_numvfs, "0") {
            error!("Failed to reset sriov_numvfs of {}", iface.name);
            return false;
        }
    }

    if !write_attr(tree, &sriov_numvfs, &num.to_string()) {
        error!("Failed to set sriov_numvfs of {} to {num}", iface.name);
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::testing::MemoryTree;
    use simple_test_case::test_case;

    fn iface(sriov_totalvfs: Option<&str>) -> LocalInterface {
        LocalInterface {
            name: "ib0".into(),
            vendor_id: "0x15b3".into(),
            address: String::new(),
            guid: None,
            sriov_totalvfs: sriov_totalvfs.map(str::to_owned),
        }
    }

    #[test_case("4", 1; "spare capacity")]
    #[test_case("2", 2; "exact capacity")]
    #[test_case("0", 0; "nothing required")]
    #[test]
    fn capacity_is_sufficient(total: &str, required: usize) {
        assert!(check_capacity(&iface(Some(total)), required).is_ok());
    }

    #[test]
    fn capacity_shortfall_is_an_error() {
        assert!(matches!(
            check_capacity(&iface(Some("2")), 3),
            Err(SriovError::InsufficientCapacity { total: 2, required: 3, .. })
        ));
    }

    #[test]
    fn missing_capacity_means_sriov_disabled_in_firmware() {
        assert!(matches!(
            check_capacity(&iface(None), 1),
            Err(SriovError::MissingCapabilities { .. })
        ));
    }

    #[test_case(""; "empty")]
    #[test_case("eight"; "text")]
    #[test_case("-1"; "negative")]
    #[test_case("+4"; "explicit sign")]
    #[test_case(" 4"; "leading space")]
    #[test_case("99999999999"; "overflow")]
    #[test]
    fn non_numeric_capacity_is_an_error(total: &str) {
        assert!(matches!(
            check_capacity(&iface(Some(total)), 1),
            Err(SriovError::ParseCapabilitiesFailure { .. })
        ));
    }

    #[test]
    fn set_num_vfs_from_zero() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/sriov_numvfs", "0");

        assert!(set_num_vfs(&tree, &iface(Some("8")), 2));

        assert_eq!(
            tree.writes(),
            vec![("class/net/ib0/device/sriov_numvfs".to_owned(), "2".to_owned())]
        );
    }

    #[test]
    fn set_num_vfs_resets_different_count() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/sriov_numvfs", "4");

        assert!(set_num_vfs(&tree, &iface(Some("8")), 2));

        assert_eq!(
            tree.writes(),
            vec![
                ("class/net/ib0/device/sriov_numvfs".to_owned(), "0".to_owned()),
                ("class/net/ib0/device/sriov_numvfs".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn set_num_vfs_rewrites_same_count() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/sriov_numvfs", "2");

        assert!(set_num_vfs(&tree, &iface(Some("8")), 2));

        assert_eq!(
            tree.writes(),
            vec![("class/net/ib0/device/sriov_numvfs".to_owned(), "2".to_owned())]
        );
    }

    #[test]
    fn failed_count_write_returns_false() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/sriov_numvfs", "0")
            .failing("class/net/ib0/device/sriov_numvfs");

        assert!(!set_num_vfs(&tree, &iface(Some("8")), 1));
        assert_eq!(
            tree.writes(),
            vec![("class/net/ib0/device/sriov_numvfs".to_owned(), "1".to_owned())]
        );
    }

    #[test]
    fn failed_reset_skips_the_count_write() {
        let tree = MemoryTree::new()
            .with("class/net/ib0/device/sriov_numvfs", "4")
            .failing("class/net/ib0/device/sriov_numvfs");

        assert!(!set_num_vfs(&tree, &iface(Some("8")), 2));
        assert_eq!(
            tree.writes(),
            vec![("class/net/ib0/device/sriov_numvfs".to_owned(), "0".to_owned())]
        );
    }
}
