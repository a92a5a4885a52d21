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

//! Runtime configuration of the provisioner.
//!
//! Settings are resolved in this order, first match wins:
//!
//! 1. command line flags
//! 2. the TOML file given with `--config`
//! 3. built-in defaults
//!
//! ```toml
//! metadata_url = "http://169.254.169.254/openstack/2018-08-27/vendor_data2.json"
//! sysfs_root = "/sys"
//! driver = "mlx5_core"
//! log_file = "/var/log/mlnx-sriov.log"
//! timeout_secs = 60
//! continue_on_error = false
//! verbose = false
//! ```

use crate::metadata::{ManifestSource, DEFAULT_FETCH_TIMEOUT};
use crate::pci::DEFAULT_VF_DRIVER;
use crate::sysfs::DEFAULT_SYSFS_ROOT;
use clap::Parser;
use serde::Deserialize;
use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_LOG_FILE: &str = "/var/log/mlnx-sriov.log";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not read config {}", path.display())]
    ReadFailure { path: PathBuf, source: io::Error },
    #[error("empty config {}", path.display())]
    Empty { path: PathBuf },
    #[error("could not parse config {}", path.display())]
    ParseFailure { path: PathBuf, source: toml::de::Error },
    #[error("both metadata_url and manifest_file are set")]
    ConflictingSources,
}

/// Command line options for mlnx-sriov.
#[derive(Parser, Debug, Default, Clone, PartialEq, Eq)]
#[clap(author, version, about, long_about = None)]
pub struct MlnxSriovOptions {
    /// TOML configuration file.
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,
    /// Vendor data endpoint. Defaults to the OpenStack metadata service.
    #[clap(long, value_parser, conflicts_with = "manifest_file")]
    pub metadata_url: Option<String>,
    /// Read the vendor data document from a file instead of the network.
    #[clap(long, value_parser)]
    pub manifest_file: Option<PathBuf>,
    /// Mount point of sysfs. Defaults to /sys
    #[clap(long, value_parser)]
    pub sysfs_root: Option<PathBuf>,
    /// Driver the virtual functions are rebound to. Defaults to mlx5_core
    #[clap(long, value_parser)]
    pub driver: Option<String>,
    /// Log file, in addition to stdout. Defaults to /var/log/mlnx-sriov.log
    #[clap(long, value_parser)]
    pub log_file: Option<PathBuf>,
    /// Metadata request timeout in seconds. Defaults to 60
    #[clap(long, value_parser)]
    pub timeout_secs: Option<u64>,
    /// Keep provisioning the remaining interfaces after a fatal error on one.
    #[clap(long, overrides_with = "no_continue_on_error")]
    pub continue_on_error: bool,
    /// Stop at the first fatal error, even if the config file says otherwise.
    #[clap(long, overrides_with = "continue_on_error")]
    pub no_continue_on_error: bool,
    /// Toggle verbosity. Default false
    #[clap(short, long, overrides_with = "no_verbose")]
    pub verbose: bool,
    /// Turn verbosity off, even if the config file turns it on.
    #[clap(long, overrides_with = "verbose")]
    pub no_verbose: bool,
}

/// The setting of an `--x` / `--no-x` flag pair, if either was given.
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        (false, false) => None,
    }
}

/// The optional configuration file. Every key may be omitted.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub metadata_url: Option<String>,
    pub manifest_file: Option<PathBuf>,
    pub sysfs_root: Option<PathBuf>,
    pub driver: Option<String>,
    pub log_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub continue_on_error: Option<bool>,
    pub verbose: Option<bool>,
}

impl FileConfig {
    pub fn parse_from_toml_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<FileConfig, ConfigError> {
        let path = path.as_ref();
        let read_failure = |e| ConfigError::ReadFailure {
            path: path.to_path_buf(),
            source: e,
        };

        let mut config_toml = String::new();
        let mut file = File::open(path).map_err(read_failure)?;
        if file.read_to_string(&mut config_toml).map_err(read_failure)? == 0 {
            return Err(ConfigError::Empty { path: path.to_path_buf() });
        }

        FileConfig::parse_from_toml(&config_toml).map_err(|e| {
            ConfigError::ParseFailure { path: path.to_path_buf(), source: e }
        })
    }

    pub fn parse_from_toml(
        config_toml: &str,
    ) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(config_toml)
    }
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: ManifestSource,
    pub sysfs_root: PathBuf,
    pub driver: String,
    pub log_file: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub continue_on_error: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: ManifestSource::default(),
            sysfs_root: PathBuf::from(DEFAULT_SYSFS_ROOT),
            driver: DEFAULT_VF_DRIVER.to_owned(),
            log_file: Some(PathBuf::from(DEFAULT_LOG_FILE)),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            continue_on_error: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Resolve the options, reading `--config` if it was given.
    pub fn load(options: &MlnxSriovOptions) -> Result<Self, ConfigError> {
        let file = match &options.config {
            Some(path) => FileConfig::parse_from_toml_file(path)?,
            None => FileConfig::default(),
        };
        Self::merge(options, file)
    }

    pub fn merge(
        options: &MlnxSriovOptions,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        // a source on the command line replaces any source in the file
        let (metadata_url, manifest_file) =
            if options.metadata_url.is_some() || options.manifest_file.is_some()
            {
                (options.metadata_url.clone(), options.manifest_file.clone())
            } else {
                (file.metadata_url, file.manifest_file)
            };
        let source = match (metadata_url, manifest_file) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingSources),
            (Some(url), None) => ManifestSource::Url(url),
            (None, Some(path)) => ManifestSource::File(path),
            (None, None) => defaults.source,
        };

        Ok(Self {
            source,
            sysfs_root: options
                .sysfs_root
                .clone()
                .or(file.sysfs_root)
                .unwrap_or(defaults.sysfs_root),
            driver: options
                .driver
                .clone()
                .or(file.driver)
                .unwrap_or(defaults.driver),
            log_file: options
                .log_file
                .clone()
                .or(file.log_file)
                .or(defaults.log_file),
            fetch_timeout: options
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            continue_on_error: switch(
                options.continue_on_error,
                options.no_continue_on_error,
            )
            .or(file.continue_on_error)
            .unwrap_or(defaults.continue_on_error),
            verbose: switch(options.verbose, options.no_verbose)
                .or(file.verbose)
                .unwrap_or(defaults.verbose),
        })
    }
}
