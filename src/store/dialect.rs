//! Per-backend SQL for the token table.
//!
//! Everything the store sends is built here so the differences between
//! backends (placeholders, auto-increment, index DDL, single-row updates)
//! stay in one place.

use crate::errors::{StoreError, StoreResult};

/// Key columns that can be looked up and soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyColumn {
    Code,
    Access,
    Refresh,
}

impl KeyColumn {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyColumn::Code => "code",
            KeyColumn::Access => "access",
            KeyColumn::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> StoreResult<Self> {
        let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(StoreError::Config(format!(
                "unsupported database scheme {:?}",
                scheme
            ))),
        }
    }

    /// True for SQLite DSNs whose database lives in memory. Every new
    /// connection to such a DSN sees its own empty database.
    pub fn is_in_memory(self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self == Dialect::Sqlite && (url.contains(":memory:") || url.contains("mode=memory"))
    }

    /// Bind marker for the `n`th parameter, 1-based.
    pub fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Statements that idempotently provision the table and its four indexes.
    pub fn provision(self, table: &str) -> Vec<String> {
        let id = match self {
            Dialect::Postgres => "id BIGSERIAL PRIMARY KEY",
            Dialect::MySql => "id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            Dialect::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
        };
        let columns = format!(
            "{id},
    expired_at BIGINT NOT NULL,
    code VARCHAR(512) NOT NULL DEFAULT '',
    access VARCHAR(512) NOT NULL DEFAULT '',
    refresh VARCHAR(512) NOT NULL DEFAULT '',
    data VARCHAR(2048) NOT NULL"
        );

        match self {
            // MySQL has no CREATE INDEX IF NOT EXISTS; declare them inline.
            Dialect::MySql => {
                let indexes: Vec<String> = index_columns()
                    .map(|col| format!("INDEX {} ({})", index_name(table, col), col))
                    .collect();
                vec![format!(
                    "CREATE TABLE IF NOT EXISTS {table} (\n    {columns},\n    {}\n) DEFAULT CHARSET=utf8mb4",
                    indexes.join(",\n    ")
                )]
            }
            Dialect::Postgres | Dialect::Sqlite => {
                let mut stmts = vec![format!("CREATE TABLE IF NOT EXISTS {table} (\n    {columns}\n)")];
                stmts.extend(index_columns().map(|col| {
                    format!(
                        "CREATE INDEX IF NOT EXISTS {} ON {table} ({col})",
                        index_name(table, col)
                    )
                }));
                stmts
            }
        }
    }

    pub fn insert(self, table: &str) -> String {
        let p: Vec<String> = (1..=5).map(|n| self.placeholder(n)).collect();
        format!(
            "INSERT INTO {table} (expired_at, code, access, refresh, data) VALUES ({})",
            p.join(", ")
        )
    }

    pub fn select_by(self, table: &str, key: KeyColumn) -> String {
        format!(
            "SELECT id, expired_at, code, access, refresh, data FROM {table} WHERE {} = {} LIMIT 1",
            key.as_str(),
            self.placeholder(1)
        )
    }

    /// Clear `key` on at most one matching row.
    pub fn clear_key(self, table: &str, key: KeyColumn) -> String {
        let col = key.as_str();
        let p = self.placeholder(1);
        match self {
            Dialect::MySql => format!("UPDATE {table} SET {col} = '' WHERE {col} = {p} LIMIT 1"),
            Dialect::Postgres | Dialect::Sqlite => format!(
                "UPDATE {table} SET {col} = '' WHERE id = (SELECT id FROM {table} WHERE {col} = {p} LIMIT 1)"
            ),
        }
    }

    pub fn count_expired(self, table: &str) -> String {
        format!(
            "SELECT COUNT(*) FROM {table} WHERE expired_at <= {}",
            self.placeholder(1)
        )
    }

    pub fn delete_expired(self, table: &str) -> String {
        format!("DELETE FROM {table} WHERE expired_at <= {}", self.placeholder(1))
    }
}

fn index_columns() -> impl Iterator<Item = &'static str> {
    ["code", "access", "refresh", "expired_at"].into_iter()
}

fn index_name(table: &str, column: &str) -> String {
    format!("idx_{}_{}", table, column)
}

/// Table names are spliced into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: &str) -> StoreResult<()> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok && name.len() <= 64 {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}
