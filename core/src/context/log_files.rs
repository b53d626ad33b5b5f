use crate::context::WatcherError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

const LOG_NAME_MARKER: &str = "CombatLog_";
const BACKUP_MARKER: &str = "backup";

/// A combat log known by path and last-modified time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl LogFile {
    pub fn from_path(path: &Path) -> Result<Self, WatcherError> {
        let modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(|source| WatcherError::Metadata {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            modified,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// A different file modified strictly after `current`
    pub fn supersedes(&self, current: Option<&LogFile>) -> bool {
        match current {
            Some(current) => self.path != current.path && self.modified > current.modified,
            None => true,
        }
    }
}

pub fn is_combat_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.contains(LOG_NAME_MARKER) && !n.contains(BACKUP_MARKER))
        .unwrap_or(false)
}

/// Most recently modified combat log in `dir`, if any.
pub fn find_newest_log(dir: &Path) -> Result<Option<LogFile>, WatcherError> {
    let entries = fs::read_dir(dir).map_err(|source| WatcherError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let newest = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|e| e.path())
        .filter(|p| is_combat_log(p))
        .filter_map(|p| LogFile::from_path(&p).ok())
        .max_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.path.cmp(&b.path))
        });

    Ok(newest)
}
