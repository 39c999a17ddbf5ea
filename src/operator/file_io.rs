use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{error, warn};

use super::{FileOperator, OperatorState};
use crate::codec;
use crate::meta::{ensure_file_exists, split_path, stat_file, validated_path, FileExtension, FileInfo};
use crate::{OrmError, Row};

impl FileOperator {
    /// Bind an operator to a CSV or JSON file path. The path is validated
    /// (name sanitized, extension checked) but not touched until `load` or
    /// `commit`.
    pub fn new(path: &Path) -> Result<Self, OrmError> {
        let path = validated_path(path)?;
        let (_, _, ext) = split_path(&path);
        let extension = FileExtension::from_str(&ext)?;
        Ok(FileOperator {
            path,
            extension,
            rows: BTreeMap::new(),
            next_index: 0,
            state: OperatorState::Unloaded,
            info: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> FileExtension {
        self.extension
    }

    pub fn info(&self) -> Option<&FileInfo> {
        self.info.as_ref()
    }

    /// Read the backing file into the row-store. A missing file is created
    /// empty; an empty or unparsable file is logged and leaves the store
    /// empty. Metadata is refreshed at the end either way.
    pub fn load(&mut self) -> Result<(), OrmError> {
        self.rows.clear();
        self.next_index = 0;
        match fs::read_to_string(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!(
                    "file at {} does not exist, creating a new one",
                    self.path.display()
                );
                ensure_file_exists(&self.path)?;
            }
            Err(e) => return Err(e.into()),
            Ok(text) if text.trim().is_empty() => {
                warn!("no data in the file {}", self.path.display());
            }
            Ok(text) => {
                let parsed = match self.extension {
                    FileExtension::Csv => codec::read_csv(&text),
                    FileExtension::Json => codec::read_json(&text),
                };
                match parsed {
                    Ok(rows) => {
                        for (index, row) in rows.into_iter().enumerate() {
                            self.rows.insert(index as u64, row);
                        }
                        self.next_index = self.rows.len() as u64;
                    }
                    Err(e) => {
                        warn!(
                            "could not parse {} as {}: {}",
                            self.path.display(),
                            self.extension,
                            e
                        );
                    }
                }
            }
        }
        self.state = OperatorState::Loaded;
        self.refresh_metadata()
    }

    /// Flush the full row-store to the backing file, overwriting it, then
    /// refresh metadata so `modified_at` reflects the flush. An empty CSV
    /// store has no header to write and leaves the file untouched.
    pub fn commit(&mut self) -> Result<(), OrmError> {
        let rows: Vec<&Row> = self.rows.values().collect();
        match self.extension {
            FileExtension::Csv => {
                if rows.is_empty() {
                    warn!("no data to write to {}", self.path.display());
                    return Ok(());
                }
                codec::write_csv(&self.path, &rows)?;
            }
            FileExtension::Json => codec::write_json(&self.path, &rows)?,
        }
        self.state = OperatorState::Loaded;
        self.refresh_metadata()
    }

    /// Write the current row-store to `path` in the given format, leaving
    /// this operator's own file, rows and state untouched.
    pub fn export_as(&self, extension: FileExtension, path: &Path) -> Result<PathBuf, OrmError> {
        if self.rows.is_empty() {
            warn!("no data to export to {}", path.display());
            return Ok(path.to_path_buf());
        }
        let target = validated_path(path)?;
        let rows: Vec<&Row> = self.rows.values().collect();
        match extension {
            FileExtension::Csv => codec::write_csv(&target, &rows)?,
            FileExtension::Json => codec::write_json(&target, &rows)?,
        }
        Ok(target)
    }

    /// Replace the [`FileInfo`] record from a fresh stat plus the current
    /// column/type map.
    pub(super) fn refresh_metadata(&mut self) -> Result<(), OrmError> {
        let (_, stem, _) = split_path(&self.path);
        let mut info = FileInfo::new(&stem, self.extension.as_str())?;
        if let Ok(stat) = stat_file(&self.path) {
            info = info.refreshed(stat, self.column_types());
        } else {
            info.columns = self.column_types();
        }
        self.info = Some(info);
        Ok(())
    }

    /// Recompute the column/type map after a mutation without re-statting
    /// the file.
    pub(super) fn refresh_columns(&mut self) {
        let columns = self.column_types();
        match self.info.take() {
            Some(info) => {
                self.info = Some(FileInfo { columns, ..info });
            }
            None => {
                // first data before any load: build the record from the path
                let (_, stem, _) = split_path(&self.path);
                if let Ok(mut info) = FileInfo::new(&stem, self.extension.as_str()) {
                    info.columns = columns;
                    self.info = Some(info);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{row, Value};

    #[test]
    fn load_missing_file_creates_it_empty() -> Result<(), OrmError> {
        crate::init_logging();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fresh.csv");
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        assert!(path.exists());
        assert!(op.is_empty());
        assert_eq!(op.state(), OperatorState::Loaded);
        assert!(op.info().expect("metadata").columns.is_empty());
        Ok(())
    }

    #[test]
    fn load_malformed_json_leaves_store_empty() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json")?;
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        assert!(op.is_empty());
        assert_eq!(op.state(), OperatorState::Loaded);
        Ok(())
    }

    #[test]
    fn csv_delete_and_commit_scenario() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("people.csv");
        fs::write(&path, "name,age\na,1\nb,2\n")?;

        let mut op = FileOperator::new(&path)?;
        op.load()?;
        assert_eq!(op.len(), 2);

        op.delete("name", &Value::from("a"));
        assert_eq!(op.len(), 1);
        let remaining: Vec<&Row> = op.rows().values().collect();
        assert_eq!(remaining[0], &row([("name", "b"), ("age", "2")]));

        op.commit()?;
        let text = fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["name,age", "b,2"]);
        Ok(())
    }

    #[test]
    fn insert_many_then_export_as_csv_scenario() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.json");
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        assert!(op.is_empty());

        op.insert_many(vec![
            row([("name", "a"), ("age", "1")]),
            row([("name", "b"), ("age", "2")]),
        ]);

        let target = dir.path().join("out.csv");
        op.export_as(FileExtension::Csv, &target)?;
        let text = fs::read_to_string(&target)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["name,age", "a,1", "b,2"]);

        // the operator's own file and state are untouched
        assert_eq!(op.state(), OperatorState::Dirty);
        assert_eq!(fs::read_to_string(&path)?, "");
        Ok(())
    }

    #[test]
    fn json_commit_load_round_trip() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("round.json");
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        op.insert_many(vec![
            row([
                ("name", Value::from("a")),
                ("age", Value::from(1i64)),
                ("active", Value::from(true)),
            ]),
            row([("name", Value::from("b")), ("age", Value::from(2i64))]),
        ]);
        let before: Vec<Row> = op.rows().values().cloned().collect();
        op.commit()?;
        assert_eq!(op.state(), OperatorState::Loaded);

        let mut reloaded = FileOperator::new(&path)?;
        reloaded.load()?;
        let after: Vec<Row> = reloaded.rows().values().cloned().collect();
        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn csv_round_trip_loads_cells_as_text() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("typed.csv");
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        op.insert(row([("name", Value::from("a")), ("age", Value::from(1i64))]));
        op.commit()?;

        let mut reloaded = FileOperator::new(&path)?;
        reloaded.load()?;
        assert_eq!(reloaded.rows()[&0]["age"], Value::from("1"));
        Ok(())
    }

    #[test]
    fn metadata_refreshes_on_load_and_commit() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("meta.json");
        let mut op = FileOperator::new(&path)?;
        op.load()?;
        assert_eq!(op.info().expect("metadata").name, "meta");

        op.insert(row([("age", Value::from(30i64))]));
        assert_eq!(op.info().expect("metadata").columns["age"], "integer");

        op.commit()?;
        let info = op.info().expect("metadata");
        assert!(info.size_kb > 0.0);
        assert_eq!(info.columns["age"], "integer");
        Ok(())
    }

    #[test]
    fn path_is_validated_at_construction() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("t3es*t_file.csv");
        let op = FileOperator::new(&path)?;
        assert_eq!(
            op.path().file_name().and_then(|n| n.to_str()),
            Some("t3est_file.csv")
        );
        assert!(FileOperator::new(&dir.path().join("data.xml")).is_err());
        Ok(())
    }
}
