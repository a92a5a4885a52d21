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

use super::RebindError;
use crate::cmd::run_cmd;

const LSPCI: &str = "lspci";

/// List Mellanox virtual functions by asking `lspci -D`.
pub(crate) async fn list_mellanox_vfs() -> Result<Vec<String>, RebindError> {
    let output = run_cmd(LSPCI, &["-D"]).await?;
    if !output.success() {
        return Err(RebindError::ListFailure {
            command: output.command,
            code: output.code,
        });
    }
    Ok(parse_mellanox_vfs(&output.stdout))
}

/// Pick the PCI addresses of Mellanox virtual functions out of `lspci -D`
/// output, e.g.
///
/// ```text
/// 0000:81:00.1 Infiniband controller: Mellanox Technologies MT28908 Family [ConnectX-6 Virtual Function]
/// ```
pub(crate) fn parse_mellanox_vfs(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| {
            line.contains("Mellanox") && line.contains("Virtual Function")
        })
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_owned)
        .collect()
}
