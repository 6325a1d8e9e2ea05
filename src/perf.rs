//! Opt-in timing scopes and a per-node render debug log.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::Instant;

/// Environment variable naming a debug log file.
pub const DEBUG_LOG_ENV: &str = "TABLEMAIL_RENDER_DEBUG_LOG";

static TIMING: AtomicBool = AtomicBool::new(false);
static DEBUG_LOG: LazyLock<Mutex<Option<DebugLog>>> = LazyLock::new(|| Mutex::new(None));

/// Reports its lifetime on drop when timing is enabled.
#[derive(Debug)]
#[must_use = "the scope is timed until it is dropped"]
pub struct Scope {
    label: &'static str,
    started: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if timing_enabled() {
            let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
            eprintln!("[perf] {}: {elapsed_ms:.2} ms", self.label);
        }
    }
}

pub fn scope(label: &'static str) -> Scope {
    Scope {
        label,
        started: Instant::now(),
    }
}

pub fn set_timing(enabled: bool) {
    TIMING.store(enabled, Ordering::Relaxed);
}

pub fn timing_enabled() -> bool {
    TIMING.load(Ordering::Relaxed)
}

#[derive(Debug)]
struct DebugLog {
    started: Instant,
    writer: BufWriter<File>,
}

fn debug_log() -> MutexGuard<'static, Option<DebugLog>> {
    DEBUG_LOG.lock().expect("render debug log lock poisoned")
}

/// Start writing render events to `path`, or stop when `None`.
pub fn set_debug_log(path: Option<&Path>) -> io::Result<()> {
    let mut log = debug_log();
    if let Some(mut previous) = log.take() {
        previous.writer.flush()?;
    }
    if let Some(path) = path {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "tablemail render log")?;
        writer.flush()?;
        *log = Some(DebugLog {
            started: Instant::now(),
            writer,
        });
    }
    Ok(())
}

pub fn debug_log_enabled() -> bool {
    debug_log().is_some()
}

/// Append one event; `detail` is only evaluated when logging is active.
pub fn log_event(event: &str, detail: impl FnOnce() -> String) {
    let mut log = debug_log();
    let Some(log) = log.as_mut() else {
        return;
    };
    let elapsed_ms = log.started.elapsed().as_secs_f64() * 1000.0;
    // A broken log must never interrupt rendering.
    let _ = writeln!(log.writer, "{elapsed_ms:>10.3} ms  {event}  {}", detail());
    let _ = log.writer.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_timing_flag_toggles() {
        set_timing(true);
        assert!(timing_enabled());
        set_timing(false);
        assert!(!timing_enabled());
    }

    #[test]
    fn test_debug_log_records_events_lazily() {
        let file = NamedTempFile::new().unwrap();
        set_debug_log(Some(file.path())).unwrap();
        assert!(debug_log_enabled());
        log_event("render.node", || "id=1 strategy=Text".to_string());
        set_debug_log(None).unwrap();
        assert!(!debug_log_enabled());

        let mut called = false;
        log_event("render.node", || {
            called = true;
            String::new()
        });
        assert!(!called, "detail evaluated with logging off");

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("tablemail render log"));
        assert!(content.contains("render.node  id=1 strategy=Text"));
    }
}
