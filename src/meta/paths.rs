use std::fs::{create_dir_all, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::info;

use super::{FileInfo, FileStat};
use crate::OrmError;

/// Decompose a path into `(directory, stem, extension)`. The extension comes
/// back without its leading dot; missing pieces are empty strings.
pub fn split_path(path: &Path) -> (String, String, String) {
    let directory = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (directory, stem, extension)
}

/// Run a caller-supplied path through [`FileInfo`] validation and rejoin it,
/// so later file creation cannot fail the name/extension checks.
pub fn validated_path(path: &Path) -> Result<PathBuf, OrmError> {
    let (directory, stem, extension) = split_path(path);
    let info = FileInfo::new(&stem, &extension)?;
    let file_name = format!("{}.{}", info.name, info.extension);
    if directory.is_empty() {
        Ok(PathBuf::from(file_name))
    } else {
        Ok(PathBuf::from(directory).join(file_name))
    }
}

/// Size and timestamps for an existing file. Creation time falls back to the
/// modification time on filesystems that do not record it.
pub fn stat_file(path: &Path) -> Result<FileStat, OrmError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(OrmError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let modified_at: DateTime<Local> = metadata.modified()?.into();
    let created_at: DateTime<Local> = metadata
        .created()
        .map(Into::into)
        .unwrap_or(modified_at);
    Ok(FileStat {
        size_kb: metadata.len() as f64 / 1024.0,
        created_at,
        modified_at,
    })
}

/// Create an empty file at the validated path if it is absent. Idempotent;
/// returns the path actually used.
pub fn ensure_file_exists(path: &Path) -> Result<PathBuf, OrmError> {
    let path = validated_path(path)?;
    if !path.exists() {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        OpenOptions::new().create(true).write(true).open(&path)?;
        info!("created empty data file at {}", path.display());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_basic() {
        let (dir, stem, ext) = split_path(Path::new("test_files/users.csv"));
        assert_eq!(dir, "test_files");
        assert_eq!(stem, "users");
        assert_eq!(ext, "csv");
    }

    #[test]
    fn split_path_without_directory_or_extension() {
        let (dir, stem, ext) = split_path(Path::new("users"));
        assert_eq!(dir, "");
        assert_eq!(stem, "users");
        assert_eq!(ext, "");
    }

    #[test]
    fn validated_path_cleans_stem() -> Result<(), OrmError> {
        let path = validated_path(Path::new("test_files/t3es*t_file.csv"))?;
        assert_eq!(path, PathBuf::from("test_files/t3est_file.csv"));
        Ok(())
    }

    #[test]
    fn validated_path_rejects_unknown_extension() {
        assert!(validated_path(Path::new("data.xml")).is_err());
    }

    #[test]
    fn stat_file_missing_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            stat_file(&missing),
            Err(OrmError::NotFound(_))
        ));
    }

    #[test]
    fn ensure_file_exists_is_idempotent() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("fresh.json");
        let created = ensure_file_exists(&target)?;
        assert!(created.exists());
        let again = ensure_file_exists(&target)?;
        assert_eq!(created, again);
        Ok(())
    }

    #[test]
    fn stat_file_reports_size() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("sized.csv");
        std::fs::write(&target, vec![b'x'; 2048])?;
        let stat = stat_file(&target)?;
        assert!((stat.size_kb - 2.0).abs() < f64::EPSILON);
        Ok(())
    }
}
