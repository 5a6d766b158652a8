/// Logging setup
///
/// Console logging via env_logger plus an in-memory ring buffer of the last
/// 1000 entries, so the host can export recent logs and the panic hook can
/// dump them next to the backtrace.
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use backtrace::Backtrace;
use chrono::Utc;
use env_logger::fmt::Color;
use log::{Level, LevelFilter, Metadata, Record};

const MAX_LOG_LINES: usize = 1000;

struct BufferLogger {
    log_buffer: Arc<Mutex<VecDeque<String>>>,
}

impl BufferLogger {
    fn new() -> Self {
        Self {
            log_buffer: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES))),
        }
    }

    fn log_to_buffer(&self, message: &str, target: &str) {
        if target.starts_with("trackcurator") {
            let mut buffer = self.log_buffer.lock().unwrap();
            if buffer.len() == MAX_LOG_LINES {
                buffer.pop_front();
            }
            buffer.push_back(message.to_string());
        }
    }

    fn get_shared_buffer(&self) -> Arc<Mutex<VecDeque<String>>> {
        Arc::clone(&self.log_buffer)
    }
}

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.target().starts_with("trackcurator") && metadata.level() <= LevelFilter::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("{:<5} {}", record.level(), record.args());
            self.log_to_buffer(&message, record.target());
        }
    }

    fn flush(&self) {}
}

struct CompositeLogger {
    console_logger: env_logger::Logger,
    buffer_logger: BufferLogger,
}

impl log::Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console_logger.enabled(metadata) || self.buffer_logger.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.console_logger.enabled(record.metadata()) {
            self.console_logger.log(record);
        }
        if self.buffer_logger.enabled(record.metadata()) {
            self.buffer_logger.log(record);
        }
    }

    fn flush(&self) {
        self.console_logger.flush();
        self.buffer_logger.flush();
    }
}

/// Install the composite logger. Returns the shared buffer handle for log
/// export and the panic hook.
pub fn setup_logger(_app_name: &str) -> Arc<Mutex<VecDeque<String>>> {
    let buffer_logger = BufferLogger::new();
    let shared_buffer = buffer_logger.get_shared_buffer();

    let mut builder = env_logger::Builder::new();
    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_env("RUST_LOG");
    } else if cfg!(debug_assertions) {
        builder.filter(Some("trackcurator"), LevelFilter::Debug);
    } else {
        builder.filter(Some("trackcurator"), LevelFilter::Info);
    }

    builder.filter(None, LevelFilter::Off);

    builder.format(|buf, record| {
        let mut style = buf.style();
        match record.level() {
            Level::Error => style.set_color(Color::Red),
            Level::Warn => style.set_color(Color::Yellow),
            Level::Info => style.set_color(Color::Green),
            Level::Debug => style.set_color(Color::Blue),
            Level::Trace => style.set_color(Color::White),
        };
        writeln!(buf, "{:<5} {}", style.value(record.level()), record.args())
    });

    let console_logger = builder.build();

    let composite_logger = CompositeLogger {
        console_logger,
        buffer_logger,
    };

    log::set_boxed_logger(Box::new(composite_logger)).expect("Failed to set logger");
    log::set_max_level(LevelFilter::Trace);

    shared_buffer
}

pub fn get_log_directory(app_name: &str) -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
        .join("logs")
}

/// Dump the buffered log lines to a timestamped file in the log directory.
pub fn export_debug_logs(
    app_name: &str,
    log_buffer: &Arc<Mutex<VecDeque<String>>>,
) -> Result<PathBuf, std::io::Error> {
    let log_dir = get_log_directory(app_name);
    std::fs::create_dir_all(&log_dir)?;
    let path = log_dir.join(format!("{}_debug.log", Utc::now().format("%Y%m%d_%H%M%S")));

    let mut file = std::fs::File::create(&path)?;
    let buffer = log_buffer.lock().unwrap();
    for line in buffer.iter() {
        writeln!(file, "{}", line)?;
    }
    Ok(path)
}

/// Write panic info, a backtrace, and the recent log buffer to panic.log.
pub fn setup_panic_hook(app_name: &str, log_buffer: Arc<Mutex<VecDeque<String>>>) {
    let log_file_path = get_log_directory(app_name).join("panic.log");
    std::fs::create_dir_all(log_file_path.parent().unwrap()).expect("Failed to create log directory");

    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::new();
        let mut file = match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&log_file_path)
        {
            Ok(file) => file,
            Err(_) => return,
        };

        let _ = writeln!(file, "Panic occurred: {}", info);
        let _ = writeln!(file, "Backtrace:\n{:?}\n", backtrace);
        let _ = writeln!(file, "Last {} log entries:\n", MAX_LOG_LINES);

        let buffer = log_buffer.lock().unwrap();
        for log in buffer.iter() {
            let _ = writeln!(file, "{}", log);
        }
    }));
}
