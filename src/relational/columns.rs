use std::fmt::Display;

use super::{ColumnSpec, ColumnType};

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Serial => String::from("SERIAL"),
            ColumnType::BigSerial => String::from("BIGSERIAL"),
            ColumnType::Integer => String::from("INTEGER"),
            ColumnType::Text => String::from("TEXT"),
            ColumnType::VarChar(size) => format!("VARCHAR({})", size),
            ColumnType::Double => String::from("DOUBLE"),
            ColumnType::Float => String::from("FLOAT"),
            ColumnType::Boolean => String::from("BOOLEAN"),
            ColumnType::Date => String::from("DATE"),
            ColumnType::DateTime => String::from("DATETIME"),
        }
    }
}

impl ColumnSpec {
    pub fn new(ty: ColumnType) -> Self {
        ColumnSpec {
            ty,
            primary_key: false,
            unique: false,
            nullable: true,
            default: None,
        }
    }

    /// Auto-incrementing `SERIAL PRIMARY KEY` column.
    pub fn primary_key() -> Self {
        ColumnSpec {
            ty: ColumnType::Serial,
            primary_key: true,
            unique: true,
            nullable: false,
            default: None,
        }
    }

    /// `BIGSERIAL PRIMARY KEY` column.
    pub fn big_primary_key() -> Self {
        ColumnSpec {
            ty: ColumnType::BigSerial,
            ..Self::primary_key()
        }
    }

    pub fn integer() -> Self {
        Self::new(ColumnType::Integer)
    }

    pub fn text() -> Self {
        Self::new(ColumnType::Text)
    }

    pub fn var_char(size: u32) -> Self {
        Self::new(ColumnType::VarChar(size))
    }

    pub fn double() -> Self {
        Self::new(ColumnType::Double)
    }

    pub fn float() -> Self {
        Self::new(ColumnType::Float)
    }

    pub fn boolean() -> Self {
        Self::new(ColumnType::Boolean)
    }

    pub fn date() -> Self {
        Self::new(ColumnType::Date)
    }

    pub fn date_time() -> Self {
        Self::new(ColumnType::DateTime)
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }

    /// Render the DDL fragment for this column. A primary key always renders
    /// `<type> PRIMARY KEY` and ignores every other flag; otherwise
    /// `DEFAULT` is only emitted for nullable columns, so it never appears
    /// next to `NOT NULL`.
    pub fn render(&self) -> String {
        if self.primary_key {
            return format!("{} PRIMARY KEY", self.ty.sql());
        }
        let mut rendered = self.ty.sql();
        if self.nullable {
            if let Some(default) = &self.default {
                rendered.push_str(&format!(" DEFAULT {}", default));
            }
        } else {
            rendered.push_str(" NOT NULL");
        }
        if self.unique {
            rendered.push_str(" UNIQUE");
        }
        rendered
    }
}

impl Display for ColumnSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
