pub mod queries;

use crate::error::AppError;
use rusqlite::{
    params_from_iter,
    types::{Value, ValueRef},
    Connection,
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info};

pub const SENSOR_TABLE: &str = "sensor";
pub const PUMP_TABLE: &str = "bomba";

pub const COL_TEMPERATURE: &str = "temperatura";
pub const COL_HUMIDITY: &str = "humedad";
pub const COL_TIMESTAMP: &str = "fecha_hora";
pub const COL_RUN_TIME: &str = "tiempo_total";
pub const COL_LITERS: &str = "litros";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Column name and value of one field of an inserted record.
pub type Field = (&'static str, Value);

/// One result row, column name -> JSON value, in column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Boundary to the relational store. Implementations decide how connections are
/// obtained; callers only see single inserts and single reads.
pub trait Store: Send + Sync {
    fn insert(&self, table: &str, fields: &[Field]) -> Result<(), AppError>;
    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, AppError>;
}

/// One insert on the blocking pool. A write may sit on a locked database for up to
/// `BUSY_TIMEOUT`, which must not stall an async worker.
pub async fn insert_blocking(store: Arc<dyn Store>, table: &'static str, fields: Vec<Field>) -> Result<(), AppError> {
    tokio::task::spawn_blocking(move || store.insert(table, &fields)).await?
}

/// SQLite-backed store. Every call opens its own connection and closes it on return,
/// so nothing is shared between the ingestion loop and concurrent HTTP requests.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) the database file, creating its directory when missing.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let store = Self { path: path.as_ref().to_path_buf() };
        if let Some(dir) = store.path.parent().filter(|dir| !dir.as_os_str().is_empty() && !dir.exists()) {
            info!(dir = %dir.display(), "Creating database directory.");
            fs::create_dir_all(dir)?;
        }
        let conn = store.connect()?;
        initialize(&conn)?;
        info!(path = %store.path.display(), "Store ready.");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, AppError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

impl Store for SqliteStore {
    fn insert(&self, table: &str, fields: &[Field]) -> Result<(), AppError> {
        check_identifier(table)?;
        for (name, _) in fields {
            check_identifier(name)?;
        }

        let query = if fields.is_empty() {
            format!("INSERT INTO {table} DEFAULT VALUES")
        } else {
            let columns = fields.iter().map(|(name, _)| *name).collect::<Vec<_>>().join(", ");
            let placeholders = (1..=fields.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
            format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})")
        };

        let conn = self.connect()?;
        conn.execute(&query, params_from_iter(fields.iter().map(|(_, value)| value)))?;
        debug!(table, "Row inserted.");
        Ok(())
    }

    fn query(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(statement)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                let mut map = Row::new();
                for (idx, name) in columns.iter().enumerate() {
                    map.insert(name.clone(), to_json(row.get_ref(idx)?));
                }
                Ok(map)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// Table and column names are spliced into SQL text, so only plain identifiers pass.
fn check_identifier(name: &str) -> Result<(), AppError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(AppError::DatabaseError(rusqlite::Error::InvalidColumnName(name.to_owned())))
    }
}

fn to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
        ValueRef::Blob(b) => b.iter().copied().map(serde_json::Value::from).collect(),
    }
}

pub fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    let query = "
        CREATE TABLE IF NOT EXISTS sensor (
            temperatura REAL NOT NULL,
            humedad REAL NOT NULL,
            fecha_hora TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP  -- UTC
        );
        CREATE INDEX IF NOT EXISTS idx_sensor_fecha_hora ON sensor (fecha_hora);

        CREATE TABLE IF NOT EXISTS bomba (
            fecha_hora TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,  -- UTC
            tiempo_total REAL,
            litros REAL
        );
        CREATE INDEX IF NOT EXISTS idx_bomba_fecha_hora ON bomba (fecha_hora);
        ";

    conn.execute_batch(query)
}
