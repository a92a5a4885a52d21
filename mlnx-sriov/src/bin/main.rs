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

#![warn(clippy::unwrap_used)]

use anyhow::Context;
use clap::Parser;
use mlnx_sriov::{
    config::{Config, MlnxSriovOptions},
    init, run, MlnxSriovError, EXIT_ERROR, EXIT_OKAY,
};
use tracing::{error, info};

async fn daemon() -> i32 {
    let options = MlnxSriovOptions::parse();

    // Logging is not up yet, report to stderr.
    let config = match Config::load(&options) {
        Ok(config) => config,
        Err(e) => {
            let e = MlnxSriovError::from(e);
            let code = e.exit_code();
            eprintln!("{:?}", anyhow::Error::new(e));
            return code;
        }
    };

    // Flushes the log file on drop, keep it until the run is over.
    let _guard = match init::init(config.verbose, config.log_file.as_deref())
        .context("failed to initialize logging")
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e:?}");
            return EXIT_ERROR;
        }
    };

    info!("Starting Mellanox SR-IOV provisioning");
    info!("Config: {config:#?}");

    match run(&config).await {
        Ok(summary) => {
            info!("Done: {summary:?}");
            EXIT_OKAY
        }
        Err(e) => {
            let code = e.exit_code();
            error!("{:?}", anyhow::Error::new(e).context("provisioning failed"));
            code
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = daemon().await;
    std::process::exit(exit_code);
}
