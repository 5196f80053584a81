use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row};
use sea_query::Value;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use iou_api::db::{self, Built};

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Lock the connection. A poisoned lock is recovered; SQLite keeps its own consistency.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)?;
    let db_path = data_dir.join("iou.db");
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;

    run_migrations(&conn)?;

    Ok(Db {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for &(name, sql) in db::migrations::MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("applied migration: {name}");
        }
    }

    Ok(())
}

/// Delete refresh tokens that have already expired. Returns the number removed.
pub fn prune_expired_tokens(db: &Db, now: &str) -> rusqlite::Result<usize> {
    execute(&db.conn(), db::tokens::delete_expired(now))
}

// ---------------------------------------------------------------------------
// sea-query → rusqlite binding
// ---------------------------------------------------------------------------

/// Convert a sea-query bind value into its SQLite representation.
fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Bool(Some(b)) => Sql::Integer(i64::from(*b)),
        Value::TinyInt(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::SmallInt(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::Int(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::BigInt(Some(n)) => Sql::Integer(*n),
        Value::TinyUnsigned(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::SmallUnsigned(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::Unsigned(Some(n)) => Sql::Integer(i64::from(*n)),
        Value::BigUnsigned(Some(n)) => Sql::Integer(i64::try_from(*n).unwrap_or(i64::MAX)),
        Value::Float(Some(f)) => Sql::Real(f64::from(*f)),
        Value::Double(Some(f)) => Sql::Real(*f),
        Value::String(Some(s)) => Sql::Text(s.to_string()),
        Value::Char(Some(c)) => Sql::Text(c.to_string()),
        Value::Bytes(Some(b)) => Sql::Blob(b.to_vec()),
        _ => Sql::Null,
    }
}

fn params(values: &sea_query::Values) -> impl rusqlite::Params + '_ {
    rusqlite::params_from_iter(values.0.iter().map(to_sql_value))
}

/// Run a built statement, returning the number of affected rows.
pub fn execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, params(&values))
}

/// Run a built query expecting at most one row.
pub fn query_opt<T>(
    conn: &Connection,
    (sql, values): Built,
    map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Option<T>> {
    conn.query_row(&sql, params(&values), map).optional()
}

/// Run a built query expecting exactly one row (counts, existence checks).
pub fn query_one<T>(
    conn: &Connection,
    (sql, values): Built,
    map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
    conn.query_row(&sql, params(&values), map)
}

/// Run a built query and collect every row.
pub fn query_all<T>(
    conn: &Connection,
    (sql, values): Built,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(params(&values), map)?.collect()
}
