//! Log writer module
//!
//! Installs the global `tracing` subscriber: one layer for application events
//! (stderr or the error log file) and one for access lines (stdout or the
//! access log file).

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::{Directive, LevelFilter, Targets};
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `tracing` target reserved for access log lines
pub const ACCESS_TARGET: &str = "access";

/// Log output target
enum LogTarget {
    Stdout,
    Stderr,
    File(File),
}

impl LogTarget {
    fn open(path: Option<&str>, console: Self) -> io::Result<Self> {
        match path {
            Some(p) => Ok(Self::File(open_log_file(p)?)),
            None => Ok(console),
        }
    }

    const fn is_console(&self) -> bool {
        !matches!(self, Self::File(_))
    }

    fn into_make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stdout => BoxMakeWriter::new(io::stdout),
            Self::Stderr => BoxMakeWriter::new(io::stderr),
            Self::File(file) => BoxMakeWriter::new(Mutex::new(file)),
        }
    }
}

/// Application-event filter: `RUST_LOG` if set, else `level`; never access lines
fn app_filter(level: &str) -> io::Result<EnvFilter> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(io::Error::other)?;
    let silence_access: Directive = format!("{ACCESS_TARGET}=off")
        .parse()
        .map_err(io::Error::other)?;
    Ok(filter.add_directive(silence_access))
}

/// Initialize the global subscriber
///
/// This should be called once at application startup.
/// Returns error if log files cannot be opened or a subscriber is already set.
pub fn init(
    level: &str,
    access_log_file: Option<&str>,
    error_log_file: Option<&str>,
) -> io::Result<()> {
    let access = LogTarget::open(access_log_file, LogTarget::Stdout)?;
    let error = LogTarget::open(error_log_file, LogTarget::Stderr)?;

    let app_layer = fmt::layer()
        .with_ansi(error.is_console())
        .with_target(true)
        .with_writer(error.into_make_writer())
        .with_filter(app_filter(level)?);

    let access_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_level(false)
        .without_time()
        .with_writer(access.into_make_writer())
        .with_filter(Targets::new().with_target(ACCESS_TARGET, LevelFilter::INFO));

    tracing_subscriber::registry()
        .with(app_layer)
        .with(access_layer)
        .try_init()
        .map_err(io::Error::other)
}

/// Open or create a log file for appending
fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}
