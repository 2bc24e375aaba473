use chrono::Utc;
use colored::*;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Step,
    Info,
    Success,
    Warning,
    Error,
}

static LOG_LEVEL_CONFIG: Lazy<HashMap<LogLevel, (&'static str, Color)>> = Lazy::new(|| {
    HashMap::from([
        (LogLevel::Step, ("STEP", Color::Magenta)),
        (LogLevel::Info, ("INFO", Color::Blue)),
        (LogLevel::Success, ("SUCCESS", Color::Green)),
        (LogLevel::Warning, ("WARNING", Color::Yellow)),
        (LogLevel::Error, ("ERROR", Color::Red)),
    ])
});

// "[ LEVEL ]" plus at least one space, padded to the widest level.
static PREFIX_WIDTH: Lazy<usize> = Lazy::new(|| {
    LOG_LEVEL_CONFIG
        .values()
        .map(|(s, _)| s.len() + 4)
        .max()
        .unwrap_or(11)
        + 1
});

static LOG_PREFIXES: Lazy<HashMap<LogLevel, String>> = Lazy::new(|| {
    colored::control::set_override(true);
    LOG_LEVEL_CONFIG
        .iter()
        .map(|(level, (label, color))| {
            let padding = PREFIX_WIDTH.saturating_sub(label.len() + 4);
            let bracketed = format!("[{}]", format!(" {} ", label).color(*color).bold());
            (*level, format!("{}{}", bracketed, " ".repeat(padding)))
        })
        .collect()
});

struct ChronoUtcTimer;
impl FormatTime for ChronoUtcTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%d %H:%M:%S%.3f %Z"))
    }
}

/// Installs the diagnostic subscriber. Console lines from [`log`] are
/// independent of it; this only governs `tracing` events.
pub fn setup_logging(verbose: bool) {
    let default_directive = if verbose {
        "boundary_fetch=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .try_from_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let format = tracing_subscriber::fmt::format()
        .with_timer(ChronoUtcTimer)
        .with_target(false)
        .compact();

    let _ = tracing_subscriber::fmt()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

pub fn log(level: LogLevel, message: &str) {
    let prefix = LOG_PREFIXES
        .get(&level)
        .cloned()
        .unwrap_or_else(|| "[ UNKNOWN ] ".to_string());

    match level {
        LogLevel::Error => eprintln!("{}{}", prefix, message),
        _ => println!("{}{}", prefix, message),
    }
}
