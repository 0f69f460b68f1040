use crate::time::TimeProvider;
use chrono::{TimeZone, Utc};
use std::{path::PathBuf, sync::Arc};
use tracing_subscriber::{
    fmt::{format::Writer, time::FormatTime},
    EnvFilter,
};

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DB_TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub const DB_DATE_FMT: &str = "%Y-%m-%d";
pub const SECS_PER_DAY: i64 = 24 * 3600;

/// Formats log timestamps with an injected clock, so simulated runs log simulated time.
pub struct TimeFormatter<T: TimeProvider> {
    pub time_provider: Arc<T>,
}

impl<T: TimeProvider> FormatTime for TimeFormatter<T> {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        match Utc.timestamp_opt(self.time_provider.now(), 0).single() {
            Some(time) => write!(w, "{}", time.to_rfc3339()),
            None => write!(w, "{}", self.time_provider.now()),
        }
    }
}

/// Installs the global subscriber. Safe to call more than once; later calls are ignored.
pub fn start_log<T: TimeProvider + 'static>(time_provider: Option<Arc<T>>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let _ = match time_provider {
        Some(time_provider) => builder.with_timer(TimeFormatter { time_provider }).try_init(),
        None => builder.try_init(),
    };
}

/// Loads `.env` from the working directory, if present. Runs before logging is up,
/// so the caller reports the outcome.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Unix timestamp -> `YYYY-MM-DD HH:MM:SS` (UTC), the layout SQLite's CURRENT_TIMESTAMP writes.
pub fn db_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0).single().map(|t| t.format(DB_TIMESTAMP_FMT).to_string()).unwrap_or_default()
}

pub fn db_date(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0).single().map(|t| t.format(DB_DATE_FMT).to_string()).unwrap_or_default()
}

/// Start of the UTC day containing `ts`.
pub fn sod(ts: i64) -> i64 {
    ts - ts.rem_euclid(SECS_PER_DAY)
}

/// Decimal rendering that always keeps a fractional part: 30.0 -> "30.0", 22.5 -> "22.5".
pub fn format_decimal(value: f64) -> String {
    format!("{:?}", value)
}
