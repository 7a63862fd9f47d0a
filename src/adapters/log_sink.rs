//! Activity-log event sink adapter.
//!
//! Implements [`EventSink`] by appending one timestamped line per
//! [`GrowEvent`] to a plain-text file, and mirroring the event to the
//! process logger.  The file survives restarts; nothing is ever truncated.
//!
//! Write failures are logged and swallowed: losing an activity line must
//! not stop the light or the pump.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::adapters::time::SystemClock;
use crate::app::events::GrowEvent;
use crate::app::ports::{Clock, EventSink};

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only activity log.
pub struct FileActivityLog<C = SystemClock> {
    path: PathBuf,
    file: File,
    clock: C,
}

impl FileActivityLog<SystemClock> {
    pub fn open(path: &Path) -> io::Result<Self> {
        Self::open_with_clock(path, SystemClock)
    }
}

impl<C: Clock> FileActivityLog<C> {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open_with_clock(path: &Path, clock: C) -> io::Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        info!("Activity log: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
            clock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<C: Clock> EventSink for FileActivityLog<C> {
    fn emit(&mut self, event: &GrowEvent) {
        info!("EVENT | {}", event);
        let stamp = self.clock.now().format(TIMESTAMP);
        if let Err(e) = writeln!(self.file, "{stamp} {event}") {
            warn!("Activity log: write to {} failed: {}", self.path.display(), e);
        }
    }
}
