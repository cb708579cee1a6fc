use crate::recognizer::Blocklist;
use log::error;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// Plates denied access, one per line with the plate in the first
/// comma-separated column. Re-read on every check so edits apply immediately.
#[derive(Debug, Clone)]
pub struct CsvBlocklist {
    path: PathBuf,
}

impl CsvBlocklist {
    /// Creates an empty file if none exists yet.
    pub fn open(path: &Path) -> CsvBlocklist {
        let created = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(path));
        if let Err(e) = created {
            error!("Blocklist file error for {:?}: {}", path, e);
        }
        CsvBlocklist {
            path: path.to_path_buf(),
        }
    }

    /// Number of lines in the file, or zero if it cannot be read.
    pub fn count(&self) -> usize {
        match fs::read_to_string(&self.path) {
            Ok(contents) => contents.lines().count(),
            Err(e) => {
                error!("Blocklist count failed: {}", e);
                0
            }
        }
    }
}

impl Blocklist for CsvBlocklist {
    fn is_blocked(&self, plate: &str) -> bool {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("Blocklist check failed: {}", e);
                return false;
            }
        };
        let plate = plate.trim().to_uppercase();
        contents
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| line.split(',').next())
            .any(|stored| stored.to_uppercase().contains(&plate))
    }
}
