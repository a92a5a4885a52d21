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

//! Process setup that has to happen before any provisioning.

pub use self::logging::{LoggingError, LoggingGuard};

use std::path::Path;
use tracing::{info, trace};

mod logging;

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    LoggingError(#[from] LoggingError),
}

/// Install the global logger. Records go to stdout and, if given, to
/// `log_file`, which is appended to across boots.
///
/// Must be called once per process; a second call fails.
pub fn init(
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<LoggingGuard, InitError> {
    let guard = logging::init(verbose, log_file)?;
    trace!("**Logging: Verbose Mode**");
    info!("mlnx-sriov is pid {}", std::process::id());
    Ok(guard)
}
