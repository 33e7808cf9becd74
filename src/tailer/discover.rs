//! Active log file discovery.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::ScanError;

/// Find the most recently modified file in the log directory.
///
/// Entries that cannot be inspected are skipped. Ties on modification time
/// are broken by file name so the choice is stable.
pub fn newest_file(dir: &Path) -> Result<PathBuf, ScanError> {
    let entries = fs::read_dir(dir).map_err(|source| ScanError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Unable to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let path = entry.path();

        let is_newer = match &newest {
            None => true,
            Some((time, best)) => (modified, &path) > (*time, best),
        };
        if is_newer {
            newest = Some((modified, path));
        }
    }

    newest
        .map(|(_, path)| path)
        .ok_or_else(|| ScanError::NoLogFiles(dir.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, modified: SystemTime) {
        let file = File::create(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_picks_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let base = SystemTime::now() - Duration::from_secs(3600);

        touch(&dir.path().join("20230101_BI.txt"), base);
        touch(&dir.path().join("20230103_BI.txt"), base + Duration::from_secs(120));
        touch(&dir.path().join("20230102_BI.txt"), base + Duration::from_secs(60));
        fs::create_dir(dir.path().join("archive")).unwrap();

        let newest = newest_file(dir.path()).unwrap();
        assert_eq!(newest.file_name().unwrap(), "20230103_BI.txt");
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(newest_file(dir.path()), Err(ScanError::NoLogFiles(_))));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            newest_file(&missing),
            Err(ScanError::DirectoryUnreadable { .. })
        ));
    }
}
