//! Append-only record of granted accesses.
//!
//! One line per grant: `name,YYYY-MM-DD HH:MM:SS.ffffff` in local time.

use chrono::{DateTime, Local};
use facegate_core::Identity;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a grant for `identity` now.
    pub fn record(&self, identity: &Identity) -> io::Result<()> {
        self.record_at(identity, Local::now())
    }

    /// Record a grant for `identity` at `at`.
    ///
    /// The file and its parent directory are created on first use.
    pub fn record_at(&self, identity: &Identity, at: DateTime<Local>) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // One write per line keeps concurrent appenders from interleaving.
        file.write_all(format_line(identity, at).as_bytes())
    }
}

fn format_line(identity: &Identity, at: DateTime<Local>) -> String {
    format!("{},{}\n", identity, at.format(TIMESTAMP_FORMAT))
}
