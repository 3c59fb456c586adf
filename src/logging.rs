use chrono::Local;
use std::{fmt, fs, io::Write, path::Path};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. With a log directory the output goes to a
/// daily rolling file and the returned guard must be kept alive.
pub fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  match log_dir {
    Some(dir) => {
      fs::create_dir_all(dir).ok();
      let file_appender = tracing_appender::rolling::daily(dir, "league_overseer.log");
      let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
      let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init();
      installed.ok().map(|_| guard)
    }
    None => {
      let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
      None
    }
  }
}

/// Emits an operational message at the verbosity picked in the config.
/// Level 0 is always shown; higher levels need a more verbose filter.
pub fn debug_message(level: u8, message: fmt::Arguments<'_>) {
  match level {
    0 => tracing::info!("{message}"),
    1 | 2 => tracing::debug!("{message}"),
    _ => tracing::trace!("{message}"),
  }
}

pub fn append_league_log(log_dir: Option<&Path>, label: &str, payload: &str) {
  let Some(dir) = log_dir else {
    return;
  };
  if fs::create_dir_all(dir).is_err() {
    return;
  }
  let path = dir.join("league_api.log");
  let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
  let entry = format!("[{timestamp}] {label}\n{payload}\n\n");
  if let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(&path) {
    let _ = file.write_all(entry.as_bytes());
  }
}
