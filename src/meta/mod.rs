use chrono::{DateTime, Local};
use indexmap::IndexMap;

pub mod file_info;
pub mod paths;

pub use paths::{ensure_file_exists, split_path, stat_file, validated_path};

/// Supported backing file formats. Anything else fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileExtension {
    Csv,
    Json,
}

/// Validated metadata for one backing file. Replaced wholesale on every
/// refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub extension: FileExtension,
    /// File size in kilobytes.
    pub size_kb: f64,
    pub created_at: DateTime<Local>,
    pub modified_at: DateTime<Local>,
    /// Column name to inferred type name. Only meaningful once at least one
    /// row exists; assigned externally, not re-validated.
    pub columns: IndexMap<String, String>,
}

/// Size and timestamps read from the filesystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileStat {
    pub size_kb: f64,
    pub created_at: DateTime<Local>,
    pub modified_at: DateTime<Local>,
}
