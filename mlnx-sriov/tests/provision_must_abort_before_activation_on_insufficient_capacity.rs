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

mod common;

use mlnx_sriov::{provision::SriovError, MlnxSriovError};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn provision_must_abort_before_activation_on_insufficient_capacity() {
    let sysfs = common::ib_host(2, 3);
    let vendor_data = common::vendor_data(
        r#"{
            "mlnx_sriov": {
                "enable_sriov": true,
                "physical_guids": ["04bd700300374486"],
                "virtual_guids": [[
                    "fefeab03004f86b9",
                    "fefe2b03002a5777",
                    "fefe6a03009db202"
                ]]
            }
        }"#,
    );

    let result =
        mlnx_sriov::run(&common::config(&sysfs, &vendor_data)).await;

    let error = result.expect_err("capacity 2 cannot hold 3 VFs");
    assert_eq!(error.exit_code(), 1);
    assert!(matches!(
        error,
        MlnxSriovError::SriovError(SriovError::InsufficientCapacity {
            total: 2,
            required: 3,
            ..
        })
    ));
    assert_eq!(sysfs.read("class/net/ib0/device/sriov_numvfs"), "0");
    assert_eq!(sysfs.read("class/net/ib0/device/sriov/0/node"), "");
    assert_eq!(sysfs.read("bus/pci/drivers/mlx5_core/bind"), "");
}

#[tokio::test]
async fn provision_must_abort_when_firmware_lacks_sriov() {
    let sysfs = test_helpers::SysfsFixture::new()
        .with_net_device("ib0", "0x15b3", common::IB0_ADDRESS)
        .with_attr("class/net/ib0/device/sriov_numvfs", "0\n");
    let vendor_data = common::vendor_data(
        r#"{
            "mlnx_sriov": {
                "enable_sriov": true,
                "physical_guids": ["04bd700300374486"],
                "virtual_guids": [["fefeab03004f86b9"]]
            }
        }"#,
    );

    let result =
        mlnx_sriov::run(&common::config(&sysfs, &vendor_data)).await;

    assert!(matches!(
        result,
        Err(MlnxSriovError::SriovError(SriovError::MissingCapabilities { .. }))
    ));
    assert_eq!(sysfs.read("class/net/ib0/device/sriov_numvfs"), "0");
}
