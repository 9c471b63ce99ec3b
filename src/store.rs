//! Configuration file store
//!
//! Responsible for:
//! - Listing `*.conf` files under the configured directory tree
//! - Reading and writing single files by bare filename
//! - Rejecting path traversal before any filesystem access
//! - Backing up existing content before every overwrite

use chrono::{DateTime, Local, Utc};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::constants::{BACKUP_INFIX, BACKUP_TIMESTAMP_FORMAT, CONFIG_EXTENSION};
use crate::daemon::config::NginxSettings;
use crate::error::{PanelError, PanelResult};
use crate::models::ConfigFile;

/// What a successful write touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: PathBuf,
    /// Backup of the previous content, if the file already existed
    pub backup: Option<PathBuf>,
}

/// Filesystem-backed view over the nginx configuration directory
#[derive(Debug)]
pub struct ConfigStore {
    config_dir: PathBuf,
    enabled_dir: Option<PathBuf>,
    max_backups: Option<usize>,
    /// Serializes backup-then-write sequences per filename
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConfigStore {
    pub fn new(settings: &NginxSettings) -> Self {
        Self::with_dirs(settings.config_path.clone(), settings.enabled_dir())
            .with_max_backups(settings.max_backups)
    }

    pub fn with_dirs(config_dir: PathBuf, enabled_dir: Option<PathBuf>) -> Self {
        Self {
            config_dir,
            enabled_dir,
            max_backups: None,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Keep at most `max_backups` backups per file (`None` or 0 keeps all)
    pub fn with_max_backups(mut self, max_backups: Option<usize>) -> Self {
        self.max_backups = max_backups.filter(|n| *n > 0);
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// List every `*.conf` file below the config directory, in traversal order
    pub fn list_files(&self) -> PanelResult<Vec<ConfigFile>> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let context = format!("failed to list config files in {}", self.config_dir.display());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "filesystem loop detected"));
                PanelError::io(context, source)
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            if !name.to_lowercase().ends_with(CONFIG_EXTENSION) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| {
                let context = format!("failed to stat {}", entry.path().display());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "metadata unavailable"));
                PanelError::io(context, source)
            })?;

            let modified = metadata
                .modified()
                .map_err(|e| PanelError::io(format!("failed to read mtime of {}", entry.path().display()), e))?;

            files.push(ConfigFile {
                name,
                path: entry.path().to_path_buf(),
                size: metadata.len(),
                modified_time: DateTime::<Utc>::from(modified),
                is_active: self.is_active(entry.path()),
            });
        }

        debug!("Listed {} config files in {}", files.len(), self.config_dir.display());
        Ok(files)
    }

    /// Read a config file by bare filename.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD.
    pub fn read_file(&self, filename: &str) -> PanelResult<String> {
        validate_filename(filename)?;
        let path = self.config_dir.join(filename);

        let bytes = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PanelError::NotFound(filename.to_string()),
            _ => PanelError::io(format!("failed to read {}", path.display()), e),
        })?;

        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => {
                debug!("{} is not valid UTF-8, decoding lossily", path.display());
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }

    /// Write a config file by bare filename, backing up any previous content.
    ///
    /// If the backup cannot be written the original is left untouched.
    pub fn write_file(&self, filename: &str, content: &str) -> PanelResult<WriteOutcome> {
        validate_filename(filename)?;
        let path = self.config_dir.join(filename);

        let lock = self.lock_for(filename);
        let result = {
            let _guard = lock.lock();
            self.write_locked(path, content)
        };
        self.release_lock(filename, &lock);
        result
    }

    fn write_locked(&self, path: PathBuf, content: &str) -> PanelResult<WriteOutcome> {
        let exists = path
            .try_exists()
            .map_err(|e| PanelError::io(format!("failed to stat {}", path.display()), e))?;

        let backup = if exists {
            let backup_path = create_backup(&path, Local::now())
                .map_err(|e| PanelError::io("failed to create backup", e))?;
            debug!("Backed up {} to {}", path.display(), backup_path.display());
            Some(backup_path)
        } else {
            None
        };

        fs::write(&path, content)
            .map_err(|e| PanelError::io(format!("failed to write {}", path.display()), e))?;

        if let Some(keep) = self.max_backups {
            if let Err(e) = prune_backups(&path, keep) {
                warn!("Failed to prune backups of {}: {}", path.display(), e);
            }
        }

        Ok(WriteOutcome { path, backup })
    }

    /// Active means a same-named entry exists in the enabled directory
    fn is_active(&self, path: &Path) -> bool {
        let Some(ref enabled_dir) = self.enabled_dir else {
            return false;
        };

        let relative = path.strip_prefix(&self.config_dir).unwrap_or(path);
        enabled_dir.join(relative).exists()
    }

    fn lock_for(&self, filename: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .lock()
            .entry(filename.to_string())
            .or_default()
            .clone()
    }

    /// Drop the map entry once no other writer holds or awaits it
    fn release_lock(&self, filename: &str, lock: &Arc<Mutex<()>>) {
        let mut locks = self.write_locks.lock();
        // One reference in the map, one held by the caller
        if Arc::strong_count(lock) == 2 {
            locks.remove(filename);
        }
    }
}

/// Reject anything that is not a bare filename
pub fn validate_filename(filename: &str) -> PanelResult<()> {
    if filename.is_empty()
        || filename == "."
        || filename.contains('/')
        || filename.contains(std::path::MAIN_SEPARATOR)
        || filename.contains("..")
    {
        return Err(PanelError::InvalidInput(filename.to_string()));
    }
    Ok(())
}

/// `<path>.backup.<YYYYMMDD-HHMMSS>`
pub fn backup_path_for(path: &Path, at: DateTime<Local>) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_INFIX);
    name.push(at.format(BACKUP_TIMESTAMP_FORMAT).to_string());
    PathBuf::from(name)
}

/// Copy `path` to a backup name that does not exist yet.
///
/// A second backup within the same second gets a `.1`, `.2`, ... suffix so
/// earlier backups are never overwritten.
fn create_backup(path: &Path, at: DateTime<Local>) -> std::io::Result<PathBuf> {
    let content = fs::read(path)?;
    let base = backup_path_for(path, at);

    let mut candidate = base.clone();
    let mut counter = 0u32;
    loop {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(&content).and_then(|_| file.sync_all()) {
                    let _ = fs::remove_file(&candidate);
                    return Err(e);
                }
                return Ok(candidate);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter += 1;
                let mut name = OsString::from(base.as_os_str());
                name.push(format!(".{}", counter));
                candidate = PathBuf::from(name);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sort key for a backup file name suffix: timestamp, then collision counter
fn backup_order(suffix: &str) -> (String, u32) {
    match suffix.split_once('.') {
        Some((stamp, counter)) => (stamp.to_string(), counter.parse().unwrap_or(0)),
        None => (suffix.to_string(), 0),
    }
}

/// Delete all but the `keep` newest backups of `path`
fn prune_backups(path: &Path, keep: usize) -> std::io::Result<()> {
    let (Some(dir), Some(file_name)) = (path.parent(), path.file_name()) else {
        return Ok(());
    };
    let prefix = format!("{}{}", file_name.to_string_lossy(), BACKUP_INFIX);

    let mut backups: Vec<((String, u32), PathBuf)> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let suffix = name.strip_prefix(&prefix)?;
            Some((backup_order(suffix), entry.path()))
        })
        .collect();

    if backups.len() <= keep {
        return Ok(());
    }

    // Timestamps sort lexically in chronological order
    backups.sort();
    let excess = backups.len() - keep;
    for (_, old) in backups.into_iter().take(excess) {
        debug!("Pruning old backup {}", old.display());
        fs::remove_file(old)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_filename_rejects_traversal() {
        for bad in ["../etc/passwd", "a/b.conf", "..", "x..conf", "", "."] {
            assert!(
                matches!(validate_filename(bad), Err(PanelError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(validate_filename("site-a.conf").is_ok());
        assert!(validate_filename(".hidden.conf").is_ok());
    }

    #[test]
    fn test_backup_path_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let backup = backup_path_for(Path::new("/etc/nginx/sites-available/app.conf"), at);
        assert_eq!(
            backup,
            PathBuf::from("/etc/nginx/sites-available/app.conf.backup.20240309-070502")
        );
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "current").unwrap();
        for stamp in ["20240101-000000", "20240102-000000", "20240103-000000"] {
            fs::write(dir.path().join(format!("app.conf.backup.{stamp}")), stamp).unwrap();
        }
        fs::write(dir.path().join("other.conf.backup.20230101-000000"), "x").unwrap();

        prune_backups(&path, 2).unwrap();

        assert!(!dir.path().join("app.conf.backup.20240101-000000").exists());
        assert!(dir.path().join("app.conf.backup.20240102-000000").exists());
        assert!(dir.path().join("app.conf.backup.20240103-000000").exists());
        assert!(dir.path().join("other.conf.backup.20230101-000000").exists());
    }

    #[test]
    fn test_prune_orders_collision_counters_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        fs::write(&path, "current").unwrap();
        for suffix in ["20240101-000000", "20240101-000000.2", "20240101-000000.10", "20240102-000000"] {
            fs::write(dir.path().join(format!("app.conf.backup.{suffix}")), suffix).unwrap();
        }

        prune_backups(&path, 2).unwrap();

        assert!(!dir.path().join("app.conf.backup.20240101-000000").exists());
        assert!(!dir.path().join("app.conf.backup.20240101-000000.2").exists());
        assert!(dir.path().join("app.conf.backup.20240101-000000.10").exists());
        assert!(dir.path().join("app.conf.backup.20240102-000000").exists());
    }

    #[test]
    fn test_backup_in_same_second_gets_counter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.conf");
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();

        fs::write(&path, "first").unwrap();
        let first = create_backup(&path, at).unwrap();
        fs::write(&path, "second").unwrap();
        let second = create_backup(&path, at).unwrap();

        assert_eq!(first, dir.path().join("app.conf.backup.20240309-070502"));
        assert_eq!(second, dir.path().join("app.conf.backup.20240309-070502.1"));
        assert_eq!(fs::read_to_string(first).unwrap(), "first");
        assert_eq!(fs::read_to_string(second).unwrap(), "second");
    }

    #[test]
    fn test_write_locks_released_after_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_dirs(dir.path().to_path_buf(), None);

        store.write_file("a.conf", "one").unwrap();
        store.write_file("a.conf", "two").unwrap();
        store.write_file("b.conf", "one").unwrap();

        assert!(store.write_locks.lock().is_empty());
    }

    #[test]
    fn test_write_lock_released_after_failed_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_dirs(dir.path().join("missing"), None);

        assert!(store.write_file("a.conf", "one").is_err());
        assert!(store.write_locks.lock().is_empty());
    }
}
