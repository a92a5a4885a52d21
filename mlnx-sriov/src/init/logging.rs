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

use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{warn, Level, Subscriber};
use tracing_subscriber::{
    fmt::MakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

#[derive(thiserror::Error, Debug)]
pub enum LoggingError {
    #[error(transparent)]
    TryInitError(#[from] tracing_subscriber::util::TryInitError),
}

/// Log file handle shared by every event the file layer writes.
#[derive(Debug, Clone)]
pub(crate) struct SharedFile(Arc<Mutex<BufWriter<File>>>);

impl SharedFile {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(Arc::new(Mutex::new(BufWriter::new(file)))))
    }
}

impl Write for SharedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().map_err(poisoned)?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().map_err(poisoned)?.flush()
    }
}

fn poisoned<T>(_: T) -> io::Error {
    io::Error::new(io::ErrorKind::Other, "log file lock poisoned")
}

/// Flushes the log file when dropped. Keep it alive for the whole run.
#[derive(Debug)]
#[must_use]
pub struct LoggingGuard {
    file: Option<SharedFile>,
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        if let Some(file) = &mut self.file {
            let _ = file.flush();
        }
    }
}

pub(crate) fn init(
    verbose: bool,
    log_file: Option<&Path>,
) -> Result<LoggingGuard, LoggingError> {
    // We hold the opinion that the program is either "verbose"
    // or it's not.
    //
    // Normal mode: Info, Warn, Error
    // Verbose mode: Debug, Trace, Info, Warn, Error
    let tracing_level = if verbose { Level::TRACE } else { Level::INFO };

    let (file, open_failure) = match log_file.map(SharedFile::open) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };

    subscriber(tracing_level, file.clone()).try_init()?;

    if let (Some(path), Some(e)) = (log_file, open_failure) {
        warn!(
            "Can't open log file {} ({e}), logging to stdout only",
            path.display()
        );
    }

    Ok(LoggingGuard { file })
}

/// Stdout and, if given, the log file. Records carry the source file and
/// line they were emitted from.
pub(crate) fn subscriber(
    tracing_level: Level,
    file: Option<SharedFile>,
) -> impl Subscriber + Send + Sync + 'static {
    subscriber_with_stdout(tracing_level, io::stdout, file)
}

fn subscriber_with_stdout<W>(
    tracing_level: Level,
    stdout: W,
    file: Option<SharedFile>,
) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    // Stdout
    let stdout_layer = tracing_subscriber::Layer::with_filter(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_file(true)
            .with_line_number(true)
            .with_writer(stdout),
        EnvFilter::new(format!("mlnx_sriov={tracing_level}")),
    );

    // File
    let file_layer = file.map(|file| {
        tracing_subscriber::Layer::with_filter(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(move || file.clone()),
            EnvFilter::new(format!("mlnx_sriov={tracing_level}")),
        )
    });

    tracing_subscriber::registry().with(stdout_layer).with(file_layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, info};

    #[test]
    fn file_records_carry_source_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mlnx-sriov.log");
        let mut file = SharedFile::open(&path).expect("open log file");

        tracing::subscriber::with_default(
            subscriber(Level::INFO, Some(file.clone())),
            || {
                info!("Creating 2 of 8 possible VFs on ib0");
                debug!("hidden below info");
            },
        );
        file.flush().expect("flush");

        let contents = std::fs::read_to_string(&path).expect("read log");
        assert!(contents.contains("Creating 2 of 8 possible VFs on ib0"));
        assert!(contents.contains("logging.rs"));
        assert!(!contents.contains("hidden below info"));
    }

    #[test]
    fn stdout_records_carry_source_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stdout.log");
        let mut stdout = SharedFile::open(&path).expect("open stdout capture");
        let writer = stdout.clone();

        tracing::subscriber::with_default(
            subscriber_with_stdout(Level::INFO, move || writer.clone(), None),
            || info!("Write 1 > class/net/ib0/device/sriov_numvfs, ret code: 0"),
        );
        stdout.flush().expect("flush");

        let contents = std::fs::read_to_string(&path).expect("read stdout");
        assert!(contents.contains("sriov_numvfs, ret code: 0"));
        assert!(contents.contains("logging.rs"));
    }

    #[test]
    fn log_file_is_appended_to() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mlnx-sriov.log");
        std::fs::write(&path, "previous boot\n").expect("seed log");

        let mut file = SharedFile::open(&path).expect("open log file");
        file.write_all(b"this boot\n").expect("write");
        file.flush().expect("flush");

        assert_eq!(
            std::fs::read_to_string(&path).expect("read log"),
            "previous boot\nthis boot\n"
        );
    }

    #[test]
    fn missing_log_directory_fails_to_open() {
        assert!(SharedFile::open(Path::new(
            "/nonexistent/mlnx-sriov/mlnx-sriov.log"
        ))
        .is_err());
    }
}
