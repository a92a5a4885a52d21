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

//! Execution of external commands.
//!
//! Only used where the host offers no sysfs equivalent. Every invocation and
//! its outcome is logged.

use std::io;
use tokio::process::Command;
use tracing::info;

#[derive(thiserror::Error, Debug)]
pub enum CmdError {
    #[error("Failed to run os cmd: {command}")]
    SpawnFailure { command: String, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub command: String,
    /// Exit code, -1 if the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `program` with `args` to completion and capture its output.
///
/// A non-zero exit is not an error here; callers decide what it means.
pub async fn run_cmd(
    program: &str,
    args: &[&str],
) -> Result<CommandOutput, CmdError> {
    let command = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");

    let output =
        Command::new(program).args(args).output().await.map_err(|e| {
            CmdError::SpawnFailure { command: command.clone(), source: e }
        })?;

    let output = CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        command,
    };

    info!("Run os cmd: {}, ret code: {}.", output.command, output.code);
    info!("Stdout:: \n{}", output.stdout);
    if !output.success() {
        info!("Stderr:: \n{}", output.stderr);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let output = run_cmd("sh", &["-c", "echo hello"]).await.unwrap();

        assert_eq!(output.command, "sh -c echo hello");
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout, "hello\n");
        assert!(output.success());
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let output =
            run_cmd("sh", &["-c", "echo oops >&2; exit 3"]).await.unwrap();

        assert_eq!(output.code, 3);
        assert_eq!(output.stderr, "oops\n");
        assert!(!output.success());
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let result = run_cmd("mlnx-sriov-no-such-program", &[]).await;

        assert!(matches!(
            result,
            Err(CmdError::SpawnFailure { command, .. })
                if command == "mlnx-sriov-no-such-program"
        ));
    }
}
