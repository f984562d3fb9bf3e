//! Inter-process maintenance lock
//!
//! The lock file holds a JSON record `{timestamp, pid, status}` and, while a
//! run is in progress, an exclusive `flock` on the open file. A record only
//! counts as held when its pid is alive and the advisory lock is taken, so a
//! recycled pid never blocks a new run.

use chrono::Local;
use fs2::FileExt;
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::errors::{LockError, MaintenanceError};

const STATUS_RUNNING: &str = "running";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LockRecord {
    pub timestamp: String,
    pub pid: u32,
    pub status: String,
}

impl LockRecord {
    fn for_current_process() -> Self {
        Self {
            timestamp: Local::now()
                .naive_local()
                .format("%Y-%m-%dT%H:%M:%S%.6f")
                .to_string(),
            pid: std::process::id(),
            status: STATUS_RUNNING.to_string(),
        }
    }
}

/// What was found at the lock path.
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    Absent,
    Held(LockRecord),
    Stale(String),
}

pub struct LockManager {
    path: PathBuf,
}

/// Proof of ownership for the duration of a run. Dropping it releases the
/// lock.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    file: Option<File>,
}

fn io_error(path: &Path, err: std::io::Error) -> LockError {
    LockError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

pub fn pid_alive(pid: u32) -> bool {
    if pid == 0 || pid > i32::MAX as u32 {
        return false;
    }
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
        || err.kind() == ErrorKind::WouldBlock
}

impl LockManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Classifies the lock file without modifying it.
    pub fn inspect(&self) -> Result<LockState, LockError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LockState::Absent),
            Err(e) => return Err(io_error(&self.path, e)),
        };

        let record = fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<LockRecord>(&content).ok());

        let record = match record {
            Some(record) => record,
            None => return Ok(LockState::Stale("lock record is unreadable".to_string())),
        };

        if !pid_alive(record.pid) {
            return Ok(LockState::Stale(format!("owner pid {} is not running", record.pid)));
        }

        match file.try_lock_exclusive() {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                Ok(LockState::Stale(format!(
                    "pid {} is alive but does not hold the lock",
                    record.pid
                )))
            }
            Err(e) if is_contended(&e) => Ok(LockState::Held(record)),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    /// Takes the lock for this process, reclaiming a stale record first.
    pub fn acquire(&self) -> Result<LockGuard, MaintenanceError> {
        match self.inspect()? {
            LockState::Held(record) => {
                warn!(
                    "Maintenance lock {} held by pid {} since {}",
                    self.path.display(),
                    record.pid,
                    record.timestamp
                );
                return Err(MaintenanceError::LockHeld {
                    pid: record.pid,
                    since: record.timestamp,
                });
            }
            LockState::Stale(reason) => {
                warn!("Removing stale maintenance lock {}: {}", self.path.display(), reason);
                match fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => return Err(io_error(&self.path, e).into()),
                }
            }
            LockState::Absent => {}
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
            }
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                // Another run created the file between inspection and creation
                return Err(self.held_by_racer());
            }
            Err(e) => return Err(io_error(&self.path, e).into()),
        };

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Err(self.held_by_racer()),
            Err(e) => return Err(io_error(&self.path, e).into()),
        }

        let record = LockRecord::for_current_process();
        let encoded = serde_json::to_string(&record).map_err(|e| LockError::Encode {
            reason: e.to_string(),
        })?;
        file.write_all(encoded.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| io_error(&self.path, e))?;

        info!("Maintenance lock created: {} (pid {})", self.path.display(), record.pid);

        Ok(LockGuard {
            path: self.path.clone(),
            file: Some(file),
        })
    }

    fn held_by_racer(&self) -> MaintenanceError {
        let record = fs::read_to_string(&self.path)
            .ok()
            .and_then(|content| serde_json::from_str::<LockRecord>(&content).ok());
        match record {
            Some(record) => MaintenanceError::LockHeld {
                pid: record.pid,
                since: record.timestamp,
            },
            None => MaintenanceError::LockHeld {
                pid: 0,
                since: "unknown".to_string(),
            },
        }
    }
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the lock file. Safe to call more than once; failures are only
    /// logged.
    pub fn release(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };

        match fs::remove_file(&self.path) {
            Ok(()) => info!("Maintenance lock removed: {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Maintenance lock {} already gone", self.path.display())
            }
            Err(e) => error!("Failed to remove maintenance lock {}: {}", self.path.display(), e),
        }

        if let Err(e) = FileExt::unlock(&file) {
            debug!("Unlock of {} failed: {}", self.path.display(), e);
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}
