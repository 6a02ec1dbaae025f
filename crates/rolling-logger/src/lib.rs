//! Rolling Logger
//!
//! Installs a `tracing` subscriber that writes to a size-rotated log file and
//! keeps the most recent lines in a circular buffer, so a shell can show a
//! log tail without touching the filesystem.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;

/// Default size at which the active log file is rotated.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// Default number of rotated files kept next to the active one.
pub const DEFAULT_MAX_FILES: usize = 3;
/// Default number of lines retained in memory.
pub const DEFAULT_BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<LogSink> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("failed to prepare log file: {0}")]
    Io(#[from] io::Error),
    #[error("a global logger is already installed")]
    AlreadyInitialized,
    #[error("logger has not been initialized")]
    NotInitialized,
}

/// Options for [`init_with_options`].
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    pub log_dir: PathBuf,
    pub app_name: String,
    pub level: Level,
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
    /// Mirror every line to stderr as well.
    pub stderr: bool,
}

impl LoggerOptions {
    pub fn new(log_dir: impl Into<PathBuf>, app_name: &str) -> Self {
        Self {
            log_dir: log_dir.into(),
            app_name: app_name.to_string(),
            level: Level::INFO,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_files: DEFAULT_MAX_FILES,
            buffer_lines: DEFAULT_BUFFER_LINES,
            stderr: true,
        }
    }
}

/// Initialize the global logger writing to `<log_dir>/<app_name>.log`.
pub fn init_logger(log_dir: impl Into<PathBuf>, app_name: &str) -> Result<(), LoggerError> {
    init_with_options(LoggerOptions::new(log_dir, app_name))
}

pub fn init_with_options(options: LoggerOptions) -> Result<(), LoggerError> {
    let file = RollingFile::open(
        &options.log_dir,
        &options.app_name,
        options.max_file_bytes,
        options.max_files,
    )?;
    let sink = LogSink::new(file, options.buffer_lines);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_writer(sink.clone());
    let stderr_layer = options.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_timer(LocalTimer)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(options.level))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    LOGGER
        .set(sink)
        .map_err(|_| LoggerError::AlreadyInitialized)?;
    tracing::info!(app = %options.app_name, dir = %options.log_dir.display(), "logger initialized");
    Ok(())
}

/// Log an info line through the installed logger.
pub fn info(message: &str) -> Result<(), LoggerError> {
    LOGGER.get().ok_or(LoggerError::NotInitialized)?;
    tracing::info!("{message}");
    Ok(())
}

/// Log an error line through the installed logger.
pub fn error(message: &str) -> Result<(), LoggerError> {
    LOGGER.get().ok_or(LoggerError::NotInitialized)?;
    tracing::error!("{message}");
    Ok(())
}

/// Most recent lines, oldest first. Empty before initialization.
pub fn recent_lines() -> Vec<String> {
    LOGGER.get().map(LogSink::recent_lines).unwrap_or_default()
}

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ========================
// Circular Buffer
// ========================

/// Fixed-capacity line buffer; the oldest line is evicted first.
#[derive(Debug)]
pub struct RingBuffer {
    lines: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            partial: String::new(),
        }
    }

    /// Feed raw output; complete lines are stored, a trailing fragment waits for its newline.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(bytes));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            self.push_line(line.trim_end_matches(['\r', '\n']).to_string());
        }
    }

    pub fn push_line(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ========================
// Rolling File
// ========================

/// Log file that shifts `name.log` -> `name.log.1` -> ... once it grows past `max_bytes`.
#[derive(Debug)]
pub struct RollingFile {
    path: PathBuf,
    file: File,
    written: u64,
    max_bytes: u64,
    max_files: usize,
}

impl RollingFile {
    pub fn open(dir: &Path, app_name: &str, max_bytes: u64, max_files: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{app_name}.log"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            file,
            written,
            max_bytes: max_bytes.max(1),
            max_files,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_files == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }
        let oldest = self.rotated_path(self.max_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.rotated_path(1))?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RollingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

// ========================
// Sink
// ========================

struct SinkState {
    file: RollingFile,
    buffer: RingBuffer,
}

/// Cloneable writer shared by the fmt layer and the buffer accessors.
#[derive(Clone)]
pub struct LogSink {
    state: Arc<Mutex<SinkState>>,
}

impl LogSink {
    pub fn new(file: RollingFile, buffer_lines: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                file,
                buffer: RingBuffer::new(buffer_lines),
            })),
        }
    }

    pub fn recent_lines(&self) -> Vec<String> {
        lock(&self.state).buffer.lines()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = lock(&self.state);
        state.buffer.push_bytes(buf);
        state.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        lock(&self.state).file.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut buffer = RingBuffer::new(2);
        buffer.push_bytes(b"one\ntwo\nthree\n");
        assert_eq!(buffer.lines(), vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn ring_buffer_holds_partial_lines_until_newline() {
        let mut buffer = RingBuffer::new(10);
        buffer.push_bytes(b"hel");
        assert!(buffer.is_empty());
        buffer.push_bytes(b"lo\r\nwor");
        assert_eq!(buffer.lines(), vec!["hello".to_string()]);
        buffer.push_bytes(b"ld\n");
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn rolling_file_rotates_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "Questline", 16, 2).unwrap();

        file.write_all(b"0123456789\n").unwrap();
        file.write_all(b"abcdefghij\n").unwrap();
        file.write_all(b"ABCDEFGHIJ\n").unwrap();
        file.flush().unwrap();

        let active = fs::read_to_string(file.path()).unwrap();
        let first = fs::read_to_string(dir.path().join("Questline.log.1")).unwrap();
        let second = fs::read_to_string(dir.path().join("Questline.log.2")).unwrap();
        assert_eq!(active, "ABCDEFGHIJ\n");
        assert_eq!(first, "abcdefghij\n");
        assert_eq!(second, "0123456789\n");
    }

    #[test]
    fn rolling_file_drops_files_beyond_max() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = RollingFile::open(dir.path(), "app", 4, 1).unwrap();
        for chunk in [b"aaaa", b"bbbb", b"cccc"] {
            file.write_all(chunk).unwrap();
        }
        assert!(dir.path().join("app.log.1").exists());
        assert!(!dir.path().join("app.log.2").exists());
        assert_eq!(fs::read_to_string(dir.path().join("app.log.1")).unwrap(), "bbbb");
    }

    #[test]
    fn sink_feeds_file_and_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let file = RollingFile::open(dir.path(), "sink", DEFAULT_MAX_FILE_BYTES, 1).unwrap();
        let path = file.path().to_path_buf();
        let mut sink = LogSink::new(file, 8);

        sink.write_all(b"first line\nsecond line\n").unwrap();
        sink.flush().unwrap();

        assert_eq!(sink.recent_lines().len(), 2);
        assert!(fs::read_to_string(path).unwrap().contains("second line"));
    }

    #[test]
    fn helpers_fail_before_init() {
        if LOGGER.get().is_none() {
            assert!(matches!(info("hello"), Err(LoggerError::NotInitialized)));
            assert!(recent_lines().is_empty());
        }
    }
}
