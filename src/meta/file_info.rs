use std::fmt::Display;
use std::str::FromStr;

use chrono::Local;
use indexmap::IndexMap;
use log::warn;

use super::{FileExtension, FileInfo, FileStat};
use crate::OrmError;

impl FileExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileExtension::Csv => "csv",
            FileExtension::Json => "json",
        }
    }
}

impl FromStr for FileExtension {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(FileExtension::Csv),
            "json" => Ok(FileExtension::Json),
            other => Err(OrmError::Validation(format!(
                "file should either be csv or json, got {:?}",
                other
            ))),
        }
    }
}

impl Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strip every character outside `[A-Za-z0-9_.-]`. Never fails:
/// `tes&t_fil*e` becomes `test_file`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect()
}

impl FileInfo {
    /// Validate `(name, extension)`. The extension check is strict, the name
    /// is sanitized instead of rejected (a warning is logged when it changed).
    pub fn new(name: &str, extension: &str) -> Result<Self, OrmError> {
        let extension = FileExtension::from_str(extension)?;
        let cleaned = sanitize_file_name(name);
        if cleaned != name {
            warn!("file name {:?} not supported, new name: {:?}", name, cleaned);
        }
        let now = Local::now();
        Ok(FileInfo {
            name: cleaned,
            extension,
            size_kb: 0.0,
            created_at: now,
            modified_at: now,
            columns: IndexMap::new(),
        })
    }

    /// Fresh metadata record carrying over the validated name and extension.
    pub fn refreshed(&self, stat: FileStat, columns: IndexMap<String, String>) -> Self {
        FileInfo {
            name: self.name.clone(),
            extension: self.extension,
            size_kb: stat.size_kb,
            created_at: stat.created_at,
            modified_at: stat.modified_at,
            columns,
        }
    }
}
