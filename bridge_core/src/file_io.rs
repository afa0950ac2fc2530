//! # Project Files
//!
//! `.pgx` project files hold a [`Project`] snapshot as pretty-printed JSON.
//!
//! - **Atomic saves**: write to `.pgx.tmp`, fsync, rename over the target
//! - **Advisory locks**: a `.pgx.lock` file records who holds the project;
//!   locks whose process is gone or that are more than a day old are stale
//! - **Schema version**: files from a newer or incompatible schema are refused
//!
//! Floats are written with round-trip precision, so a saved and reloaded
//! project analyzes to identical artifacts.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bridge_core::file_io::{load_project, save_project, FileLock};
//! use bridge_core::project::Project;
//! use std::path::Path;
//!
//! let project = Project::single_span_example();
//! let path = Path::new("girder.pgx");
//!
//! let lock = FileLock::acquire(path, "engineer@example.com").unwrap();
//! save_project(&project, path).unwrap();
//! drop(lock);
//!
//! let reloaded = load_project(path).unwrap();
//! assert_eq!(reloaded.bridge, project.bridge);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::errors::{BridgeError, BridgeResult};
use crate::project::{Project, SCHEMA_VERSION};

/// Project file extension
pub const EXTENSION: &str = "pgx";

/// Locks older than this are stale regardless of their holder (hours)
const STALE_LOCK_HOURS: i64 = 24;

/// Contents of a `.pgx.lock` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    /// Lock held by the current process
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// True when the holding process is gone or the lock has expired
    pub fn is_stale(&self) -> bool {
        if hostname().as_deref() == Some(self.machine.as_str()) && !process_alive(self.pid) {
            return true;
        }
        (Utc::now() - self.locked_at).num_hours() > STALE_LOCK_HOURS
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME").ok().or_else(|| std::env::var("HOST").ok())
    }
}

fn process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        fs::metadata(format!("/proc/{}", pid)).is_ok()
    }
    #[cfg(windows)]
    {
        use std::process::Command;
        match Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
        {
            Ok(output) => String::from_utf8_lossy(&output.stdout).contains(&pid.to_string()),
            Err(_) => true,
        }
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = pid;
        true
    }
}

/// Exclusive hold on a project file. Released on drop.
///
/// The OS-level lock from `fs2` guards against other processes; the lock
/// file's JSON tells other users who holds the project.
#[derive(Debug)]
pub struct FileLock {
    project_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock on `path`, taking over a stale lock.
    ///
    /// Fails with `FileLocked` when someone else holds it.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> BridgeResult<Self> {
        let lock_path = lock_path_for(path);
        let info = LockInfo::new(user_id);

        if let Ok(existing) = read_lock_info(&lock_path) {
            if !existing.is_stale() {
                return Err(BridgeError::file_locked(
                    path.display().to_string(),
                    format!("{} ({})", existing.user_id, existing.machine),
                    existing.locked_at.to_rfc3339(),
                ));
            }
            tracing::warn!(path = %lock_path.display(), holder = %existing.user_id, "taking over stale lock");
        }

        let mut lock_file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&lock_path)
            .map_err(|e| BridgeError::file_error("create lock", lock_path.display().to_string(), e.to_string()))?;

        lock_file.try_lock_exclusive().map_err(|_| {
            BridgeError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let json = serde_json::to_string_pretty(&info).map_err(|e| BridgeError::SerializationError {
            reason: e.to_string(),
        })?;
        lock_file
            .write_all(json.as_bytes())
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| BridgeError::file_error("write lock", lock_path.display().to_string(), e.to_string()))?;

        tracing::debug!(path = %path.display(), user = %info.user_id, "project lock acquired");
        Ok(FileLock {
            project_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current holder of a live lock on `path`, if any
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).ok().filter(|info| !info.is_stale())
    }

    pub fn project_path(&self) -> &Path {
        &self.project_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(project_path: &Path) -> PathBuf {
    suffixed(project_path, "lock")
}

/// `girder.pgx` -> `girder.pgx.<suffix>`
fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = out
        .extension()
        .map(|e| format!("{}.{}", e.to_string_lossy(), suffix))
        .unwrap_or_else(|| suffix.to_string());
    out.set_extension(extension);
    out
}

fn read_lock_info(lock_path: &Path) -> BridgeResult<LockInfo> {
    let contents = read_to_string(lock_path, "read lock")?;
    serde_json::from_str(&contents).map_err(|e| BridgeError::SerializationError { reason: e.to_string() })
}

fn read_to_string(path: &Path, operation: &str) -> BridgeResult<String> {
    let mut file = File::open(path).map_err(|e| BridgeError::file_error(operation, path.display().to_string(), e.to_string()))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| BridgeError::file_error(operation, path.display().to_string(), e.to_string()))?;
    Ok(contents)
}

/// Serialize a project as `.pgx` JSON
pub fn to_json(project: &Project) -> BridgeResult<String> {
    serde_json::to_string_pretty(project).map_err(|e| BridgeError::SerializationError { reason: e.to_string() })
}

/// Parse `.pgx` JSON and validate its schema version
pub fn from_json(json: &str) -> BridgeResult<Project> {
    let project: Project =
        serde_json::from_str(json).map_err(|e| BridgeError::SerializationError { reason: e.to_string() })?;
    validate_version(&project.meta.version)?;
    Ok(project)
}

/// Save with atomic write semantics: a crash leaves either the old file or
/// the new one, never a partial file.
pub fn save_project(project: &Project, path: &Path) -> BridgeResult<()> {
    let json = to_json(project)?;
    let tmp_path = suffixed(path, "tmp");

    let mut tmp_file = File::create(&tmp_path)
        .map_err(|e| BridgeError::file_error("create temp file", tmp_path.display().to_string(), e.to_string()))?;
    tmp_file
        .write_all(json.as_bytes())
        .and_then(|_| tmp_file.sync_all())
        .map_err(|e| BridgeError::file_error("write temp file", tmp_path.display().to_string(), e.to_string()))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        BridgeError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;
    tracing::info!(path = %path.display(), bytes = json.len(), "project saved");
    Ok(())
}

/// Load a project file.
///
/// Fails with `VersionMismatch` for files from an incompatible schema and
/// `SerializationError` for malformed JSON.
pub fn load_project(path: &Path) -> BridgeResult<Project> {
    let contents = read_to_string(path, "open")?;
    let project = from_json(&contents).map_err(|e| match e {
        BridgeError::SerializationError { reason } => BridgeError::SerializationError {
            reason: format!("invalid project in {}: {}", path.display(), reason),
        },
        other => other,
    })?;
    tracing::info!(path = %path.display(), job = %project.meta.job_id, "project loaded");
    Ok(project)
}

/// Load a project along with the holder of a live lock on it. A locked
/// project is read-only for the caller.
pub fn load_project_with_lock_check(path: &Path) -> BridgeResult<(Project, Option<LockInfo>)> {
    let project = load_project(path)?;
    Ok((project, FileLock::check(path)))
}

/// Same major version; within 0.x the file's minor version may not be newer.
fn validate_version(file_version: &str) -> BridgeResult<()> {
    let mismatch = || BridgeError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let file = Version::parse(file_version).map_err(|_| mismatch())?;
    let current = Version::parse(SCHEMA_VERSION).map_err(|e| BridgeError::internal(e.to_string()))?;
    if file.major != current.major || (current.major == 0 && file.minor > current.minor) {
        return Err(mismatch());
    }
    Ok(())
}
