use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: Option<File>,
    tui_tx: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in ui.rs)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;
pub const COLOR_MAGENTA: u8 = 4;

const SEP: char = '\x1f';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "WARN" => Level::Warn,
            "ERROR" => Level::Error,
            _ => Level::Info,
        }
    }
}

/// One log line as carried over the TUI channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub level: Level,
    pub prefix: String,
    pub color: u8,
    pub timestamp: String,
    pub message: String,
}

impl LogRecord {
    /// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage
    pub fn encode(&self) -> String {
        format!(
            "{}{SEP}{}{SEP}{}{SEP}{}{SEP}{}",
            self.level.as_str(),
            self.prefix,
            self.color,
            self.timestamp,
            self.message
        )
    }

    /// Unstructured input decodes as a bare info message.
    pub fn decode(raw: &str) -> Self {
        let parts: Vec<&str> = raw.splitn(5, SEP).collect();
        if parts.len() < 5 {
            return Self {
                level: Level::Info,
                prefix: String::new(),
                color: 0,
                timestamp: String::new(),
                message: raw.to_string(),
            };
        }
        Self {
            level: Level::parse(parts[0]),
            prefix: parts[1].to_string(),
            color: parts[2].parse().unwrap_or(0),
            timestamp: parts[3].to_string(),
            message: parts[4].to_string(),
        }
    }

    fn file_line(&self) -> String {
        if self.prefix.is_empty() {
            format!("[{}] [{}] {}", self.timestamp, self.level.as_str(), self.message)
        } else {
            format!("[{}] [{}] [{}] {}", self.timestamp, self.level.as_str(), self.prefix, self.message)
        }
    }
}

/// Initialize the global logger. Clears the log file.
pub fn init(log_dir: &Path) {
    fs::create_dir_all(log_dir).ok();
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("hunter.log"))
        .ok();

    LOGGER
        .set(Mutex::new(Logger { file, tui_tx: None, prefixes: HashMap::new() }))
        .ok();

    register_prefix("worker", COLOR_GREEN);
    register_prefix("sched", COLOR_GRAY);
    register_prefix("nav", COLOR_GRAY);
    register_prefix("hunt", COLOR_BLUE);
    register_prefix("rune", COLOR_MAGENTA);
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    if let Some(logger) = LOGGER.get() {
        let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());
        l.tui_tx = Some(tx);
    }
}

/// Register a prefix with a color used by `*_p` calls.
pub fn register_prefix(prefix: &str, color: u8) {
    if let Some(logger) = LOGGER.get() {
        let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());
        l.prefixes.insert(prefix.to_string(), color);
    }
}

fn write_log(level: Level, prefix: &str, msg: &str) {
    let Some(logger) = LOGGER.get() else { return };
    let mut l = logger.lock().unwrap_or_else(|e| e.into_inner());

    let record = LogRecord {
        level,
        prefix: prefix.to_string(),
        color: l.prefixes.get(prefix).copied().unwrap_or(0),
        timestamp: Local::now().format("%H:%M:%S").to_string(),
        message: msg.to_string(),
    };

    if let Some(file) = l.file.as_mut() {
        writeln!(file, "{}", record.file_line()).ok();
    }
    if let Some(tx) = &l.tui_tx {
        tx.send(record.encode()).ok();
    }
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
