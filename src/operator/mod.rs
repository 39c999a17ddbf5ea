use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::meta::{FileExtension, FileInfo};
use crate::Row;

pub mod file_io;
pub mod row_store;

/// Durability state of a [`FileOperator`]. There is no implicit flush: a
/// dirty operator that is dropped simply loses its pending mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorState {
    Unloaded,
    Loaded,
    Dirty,
}

/// Row-oriented CRUD over a single CSV or JSON file. The whole dataset is
/// held in memory between `load` and `commit`; rows are keyed by an
/// insertion-ordered index that is never reused, so deletions leave gaps.
#[derive(Debug)]
pub struct FileOperator {
    path: PathBuf,
    extension: FileExtension,
    rows: BTreeMap<u64, Row>,
    // one past the highest index ever assigned
    next_index: u64,
    state: OperatorState,
    info: Option<FileInfo>,
}
