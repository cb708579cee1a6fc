use crate::recognizer::RecognitionLog;
use crate::types::{LogEntry, LogRecord};
use log::error;
use rusqlite::{params, Connection, Result};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

/// Append-only log of recognized plates.
pub struct LogStore {
    conn: Mutex<Connection>,
}

pub fn open(path: &Path) -> Result<LogStore, failure::Error> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plate TEXT NOT NULL,
            status TEXT NOT NULL,
            source TEXT NOT NULL,
            timestamp REAL NOT NULL,
            processing_time REAL NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_plate_timestamp ON logs (plate, timestamp)",
        [],
    )?;
    Ok(LogStore {
        conn: Mutex::new(conn),
    })
}

impl LogStore {
    /// Newest entries first. Errors are logged and yield an empty list.
    pub async fn recent(&self, limit: u32) -> Vec<LogRecord> {
        let conn = self.conn.lock().await;
        match recent_impl(&conn, limit) {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to fetch logs: {:?}", e);
                Vec::new()
            }
        }
    }
}

impl RecognitionLog for LogStore {
    async fn record(&self, entry: LogEntry) {
        let conn = self.conn.lock().await;
        if let Err(e) = record_impl(&conn, &entry) {
            error!("Failed to log entry for plate {}: {:?}", entry.plate, e);
        }
    }
}

fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

fn record_impl(conn: &Connection, entry: &LogEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO logs (plate, status, source, timestamp, processing_time)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.plate,
            entry.status.as_str(),
            entry.source.as_str(),
            now(),
            entry.elapsed.as_secs_f64()
        ],
    )?;
    Ok(())
}

fn recent_impl(conn: &Connection, limit: u32) -> Result<Vec<LogRecord>> {
    let mut stmt = conn.prepare(
        "SELECT plate, status, source, timestamp, processing_time
         FROM logs ORDER BY timestamp DESC, id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok(LogRecord {
            plate: row.get(0)?,
            status: row.get(1)?,
            source: row.get(2)?,
            timestamp: row.get(3)?,
            processing_time: row.get(4)?,
        })
    })?;
    rows.collect()
}
