use std::path::Path;

use log::{error, info, warn};

use super::{QueryResult, RelationalManager, SqlConnection, TableSchema};
use crate::{codec, BackendError, OrmError, Row, Value};

/// Default `LIMIT` applied by [`RelationalManager::select_all`].
pub const DEFAULT_BATCH_SIZE: usize = 1000;

impl<C: SqlConnection> RelationalManager<C> {
    pub fn new(table_name: &str, connection: C) -> Self {
        RelationalManager {
            table_name: table_name.to_string(),
            connection,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `CREATE TABLE IF NOT EXISTS`, idempotent at the SQL level.
    pub fn create_table(&mut self, schema: &TableSchema) -> Result<(), OrmError> {
        let fields: Vec<String> = schema
            .iter()
            .map(|(name, spec)| format!("{} {}", name, spec.render()))
            .collect();
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table_name,
            fields.join(", ")
        );
        self.run(&sql, &[])?;
        Ok(())
    }

    /// Dropping a table that does not exist is logged, not raised.
    pub fn drop_table(&mut self) -> Result<(), OrmError> {
        let sql = format!("DROP TABLE {}", self.table_name);
        match self.connection.execute(&sql, &[]) {
            Ok(_) => Ok(()),
            Err(BackendError::UndefinedTable(t)) => {
                warn!("table {} does not exist, nothing to drop", t);
                Ok(())
            }
            Err(e) => {
                error!("drop table failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// One `ALTER TABLE ... ADD COLUMN` per entry. A duplicate column is
    /// logged and skipped; the remaining columns are still added.
    pub fn add_columns(&mut self, columns: &TableSchema) -> Result<(), OrmError> {
        for (name, spec) in columns {
            let sql = format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                self.table_name,
                name,
                spec.render()
            );
            match self.connection.execute(&sql, &[]) {
                Ok(_) => {}
                Err(BackendError::DuplicateColumn(c)) => {
                    warn!("column {} already exists on {}", c, self.table_name);
                }
                Err(e) => {
                    error!("add column {} failed: {}", name, e);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    /// Dropping an unknown column is logged, not raised.
    pub fn drop_column(&mut self, name: &str) -> Result<(), OrmError> {
        let sql = format!("ALTER TABLE {} DROP COLUMN {}", self.table_name, name);
        match self.connection.execute(&sql, &[]) {
            Ok(_) => Ok(()),
            Err(BackendError::UndefinedColumn(c)) => {
                warn!("column {} does not exist on {}", c, self.table_name);
                Ok(())
            }
            Err(e) => {
                error!("drop column {} failed: {}", name, e);
                Err(e.into())
            }
        }
    }

    /// Raw rows for the given fields; an empty field list selects `*`.
    pub fn select(&mut self, fields: &[&str], limit: usize) -> Result<Vec<Vec<Value>>, OrmError> {
        let select_fields = if fields.is_empty() {
            String::from("*")
        } else {
            fields.join(", ")
        };
        let sql = format!(
            "SELECT {} FROM {} LIMIT {}",
            select_fields, self.table_name, limit
        );
        let result = self.run_query(&sql, &[])?;
        Ok(result.rows)
    }

    pub fn select_all(&mut self) -> Result<Vec<Vec<Value>>, OrmError> {
        self.select(&[], DEFAULT_BATCH_SIZE)
    }

    /// Insert rows as one batched statement. The column list comes from the
    /// first row; a row missing one of those columns abandons the whole
    /// batch with a logged schema mismatch and zero insertions (the driver
    /// call is a single batched statement, so partial application is not an
    /// option).
    pub fn batch_insert(&mut self, rows: &[Row]) -> Result<(), OrmError> {
        if rows.is_empty() {
            return Ok(());
        }
        let fields: Vec<&String> = rows[0].keys().collect();
        let placeholders = vec!["%s"; fields.len()].join(", ");
        let field_list: Vec<&str> = fields.iter().map(|f| f.as_str()).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name,
            field_list.join(", "),
            placeholders
        );

        let mut param_sets = Vec::with_capacity(rows.len());
        for row in rows {
            let mut params = Vec::with_capacity(fields.len());
            for field in &fields {
                match row.get(*field) {
                    Some(value) => params.push(value.clone()),
                    None => {
                        let mismatch =
                            OrmError::SchemaMismatch(format!("row is missing column {:?}", field));
                        error!("{}, batch abandoned", mismatch);
                        return Ok(());
                    }
                }
            }
            param_sets.push(params);
        }

        match self.connection.execute_batch(&sql, &param_sets) {
            Ok(_) => Ok(()),
            Err(e) => {
                error!("batch insert into {} failed: {}", self.table_name, e);
                Err(e.into())
            }
        }
    }

    /// `UPDATE <table> SET k = %s, ... WHERE k1 = %s AND k2 = %s ...`,
    /// conjunctive equality only.
    pub fn update_where(&mut self, patch: &Row, conditions: &Row) -> Result<u64, OrmError> {
        let set_clause: Vec<String> = patch.keys().map(|k| format!("{} = %s", k)).collect();
        let where_clause: Vec<String> = conditions.keys().map(|k| format!("{} = %s", k)).collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table_name,
            set_clause.join(", "),
            where_clause.join(" AND ")
        );
        let mut params: Vec<Value> = patch.values().cloned().collect();
        params.extend(conditions.values().cloned());
        self.run(&sql, &params)
    }

    /// Conjunctive equality delete.
    pub fn delete_where(&mut self, conditions: &Row) -> Result<u64, OrmError> {
        let where_clause: Vec<String> = conditions.keys().map(|k| format!("{} = %s", k)).collect();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.table_name,
            where_clause.join(" AND ")
        );
        let params: Vec<Value> = conditions.values().cloned().collect();
        self.run(&sql, &params)
    }

    /// `SELECT *` and materialize into a CSV file. Logs and writes nothing
    /// when the table is empty.
    pub fn export_as_csv(&mut self, path: &Path) -> Result<(), OrmError> {
        let Some(rows) = self.rows_for_export()? else {
            return Ok(());
        };
        let refs: Vec<&Row> = rows.iter().collect();
        codec::write_csv(path, &refs)?;
        info!("data exported to {} successfully", path.display());
        Ok(())
    }

    /// `SELECT *` and materialize into a JSON file. Logs and writes nothing
    /// when the table is empty.
    pub fn export_as_json(&mut self, path: &Path) -> Result<(), OrmError> {
        let Some(rows) = self.rows_for_export()? else {
            return Ok(());
        };
        let refs: Vec<&Row> = rows.iter().collect();
        codec::write_json(path, &refs)?;
        info!("data exported to {} successfully", path.display());
        Ok(())
    }

    fn rows_for_export(&mut self) -> Result<Option<Vec<Row>>, OrmError> {
        let sql = format!("SELECT * FROM {}", self.table_name);
        let result = self.run_query(&sql, &[])?;
        if result.rows.is_empty() {
            info!("no data in the table {}", self.table_name);
            return Ok(None);
        }
        let rows = result
            .rows
            .iter()
            .map(|values| {
                result
                    .columns
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect()
            })
            .collect();
        Ok(Some(rows))
    }

    // backend failures are logged and re-raised, never swallowed
    fn run(&mut self, sql: &str, params: &[Value]) -> Result<u64, OrmError> {
        match self.connection.execute(sql, params) {
            Ok(affected) => Ok(affected),
            Err(e) => {
                error!("statement failed on {}: {}", self.table_name, e);
                Err(e.into())
            }
        }
    }

    fn run_query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, OrmError> {
        match self.connection.query(sql, params) {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("query failed on {}: {}", self.table_name, e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::ColumnSpec;
    use crate::row;
    use indexmap::IndexMap;

    /// In-memory stand-in for the driver: records statements, keeps rows
    /// appended by `execute_batch`, and can be scripted to fail once.
    #[derive(Default)]
    struct MockConnection {
        statements: Vec<(String, Vec<Value>)>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
        fail_next: Option<BackendError>,
    }

    impl MockConnection {
        fn take_error(&mut self) -> Result<(), BackendError> {
            match self.fail_next.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    impl SqlConnection for MockConnection {
        fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, BackendError> {
            self.take_error()?;
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(1)
        }

        fn execute_batch(
            &mut self,
            sql: &str,
            param_sets: &[Vec<Value>],
        ) -> Result<u64, BackendError> {
            self.take_error()?;
            self.statements.push((sql.to_string(), vec![]));
            self.rows.extend(param_sets.iter().cloned());
            Ok(param_sets.len() as u64)
        }

        fn query(&mut self, sql: &str, params: &[Value]) -> Result<QueryResult, BackendError> {
            self.take_error()?;
            self.statements.push((sql.to_string(), params.to_vec()));
            Ok(QueryResult {
                columns: self.columns.clone(),
                rows: self.rows.clone(),
            })
        }
    }

    fn employee_schema() -> TableSchema {
        let mut schema: TableSchema = IndexMap::new();
        schema.insert(String::from("id"), ColumnSpec::primary_key());
        schema.insert(
            String::from("first_name"),
            ColumnSpec::var_char(50).not_null(),
        );
        schema.insert(
            String::from("salary"),
            ColumnSpec::integer().default_value("5000"),
        );
        schema
    }

    #[test]
    fn create_table_renders_full_ddl() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.create_table(&employee_schema())?;
        assert_eq!(
            manager.connection.statements[0].0,
            "CREATE TABLE IF NOT EXISTS employees (id SERIAL PRIMARY KEY, \
             first_name VARCHAR(50) NOT NULL, salary INTEGER DEFAULT 5000)"
        );
        Ok(())
    }

    #[test]
    fn drop_table_tolerates_undefined_table() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.connection.fail_next =
            Some(BackendError::UndefinedTable(String::from("employees")));
        manager.drop_table()?;
        Ok(())
    }

    #[test]
    fn add_columns_skips_duplicates_and_continues() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.connection.fail_next =
            Some(BackendError::DuplicateColumn(String::from("grade")));
        let mut columns: TableSchema = IndexMap::new();
        columns.insert(String::from("grade"), ColumnSpec::text());
        columns.insert(String::from("age"), ColumnSpec::integer());
        manager.add_columns(&columns)?;
        // the duplicate failed, the second column still went through
        assert_eq!(manager.connection.statements.len(), 1);
        assert_eq!(
            manager.connection.statements[0].0,
            "ALTER TABLE employees ADD COLUMN age INTEGER"
        );
        Ok(())
    }

    #[test]
    fn drop_column_tolerates_undefined_column() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.connection.fail_next =
            Some(BackendError::UndefinedColumn(String::from("grade")));
        manager.drop_column("grade")?;
        Ok(())
    }

    #[test]
    fn select_defaults_to_star_with_limit() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.select_all()?;
        manager.select(&["first_name", "salary"], 10)?;
        assert_eq!(
            manager.connection.statements[0].0,
            "SELECT * FROM employees LIMIT 1000"
        );
        assert_eq!(
            manager.connection.statements[1].0,
            "SELECT first_name, salary FROM employees LIMIT 10"
        );
        Ok(())
    }

    #[test]
    fn batch_insert_builds_one_parameterized_statement() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.batch_insert(&[
            row([("first_name", Value::from("John")), ("salary", Value::from(100i64))]),
            row([("first_name", Value::from("Jane")), ("salary", Value::from(200i64))]),
        ])?;
        assert_eq!(
            manager.connection.statements[0].0,
            "INSERT INTO employees (first_name, salary) VALUES (%s, %s)"
        );
        assert_eq!(manager.connection.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn batch_insert_with_inconsistent_keys_inserts_nothing() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.batch_insert(&[
            row([("first_name", Value::from("John")), ("salary", Value::from(100i64))]),
            row([("first_name", Value::from("Jane"))]), // missing salary
        ])?;
        // the batch was abandoned before reaching the driver
        assert!(manager.connection.statements.is_empty());
        let selected = manager.select_all()?;
        assert!(selected.is_empty());
        Ok(())
    }

    #[test]
    fn batch_insert_ignores_extra_keys_beyond_first_row() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.batch_insert(&[
            row([("first_name", Value::from("John"))]),
            row([("first_name", Value::from("Jane")), ("salary", Value::from(1i64))]),
        ])?;
        assert_eq!(manager.connection.rows.len(), 2);
        assert_eq!(manager.connection.rows[1], vec![Value::from("Jane")]);
        Ok(())
    }

    #[test]
    fn update_where_is_conjunctive() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.update_where(
            &row([("salary", Value::from(0i64))]),
            &row([("first_name", Value::from("John")), ("grade", Value::from("XII"))]),
        )?;
        let (sql, params) = &manager.connection.statements[0];
        assert_eq!(
            sql,
            "UPDATE employees SET salary = %s WHERE first_name = %s AND grade = %s"
        );
        assert_eq!(
            params,
            &vec![Value::from(0i64), Value::from("John"), Value::from("XII")]
        );
        Ok(())
    }

    #[test]
    fn delete_where_builds_conjunctive_statement() -> Result<(), OrmError> {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.delete_where(&row([("first_name", Value::from("John"))]))?;
        assert_eq!(
            manager.connection.statements[0].0,
            "DELETE FROM employees WHERE first_name = %s"
        );
        Ok(())
    }

    #[test]
    fn backend_failure_is_raised_not_swallowed() {
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.connection.fail_next =
            Some(BackendError::Unavailable(String::from("connection reset")));
        let result = manager.create_table(&employee_schema());
        assert!(matches!(result, Err(OrmError::Backend(_))));
    }

    #[test]
    fn export_empty_table_writes_no_file() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.csv");
        let mut manager = RelationalManager::new("employees", MockConnection::default());
        manager.export_as_csv(&path)?;
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn export_as_csv_materializes_rows() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("employees.csv");
        let mut connection = MockConnection::default();
        connection.columns = vec![String::from("first_name"), String::from("salary")];
        connection.rows = vec![
            vec![Value::from("John"), Value::from(100i64)],
            vec![Value::from("Jane"), Value::from(200i64)],
        ];
        let mut manager = RelationalManager::new("employees", connection);
        manager.export_as_csv(&path)?;
        let text = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["first_name,salary", "John,100", "Jane,200"]);
        Ok(())
    }

    #[test]
    fn export_as_json_materializes_rows() -> Result<(), OrmError> {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("employees.json");
        let mut connection = MockConnection::default();
        connection.columns = vec![String::from("first_name")];
        connection.rows = vec![vec![Value::from("John")]];
        let mut manager = RelationalManager::new("employees", connection);
        manager.export_as_json(&path)?;
        let loaded = codec::read_json(&std::fs::read_to_string(&path)?)?;
        assert_eq!(loaded, vec![row([("first_name", "John")])]);
        Ok(())
    }
}
