use std::io::Write;
use std::sync::{Arc, Mutex};

/// Where the router prints its `[REMOTE METRICS]` summary lines.
///
/// `Buffer` captures lines in memory instead of touching the real stdout.
#[derive(Clone, Default)]
pub enum SummaryWriter {
    #[default]
    Stdout,
    Buffer(Arc<Mutex<Vec<String>>>),
}

impl SummaryWriter {
    /// A capturing writer plus a handle to read what it captured.
    pub fn buffer() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (SummaryWriter::Buffer(Arc::clone(&lines)), lines)
    }

    /// Write one line, appending the newline.
    pub fn write_line(&self, line: &str) -> std::io::Result<()> {
        match self {
            SummaryWriter::Stdout => {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                writeln!(out, "{}", line)
            }
            SummaryWriter::Buffer(lines) => {
                // poisoned only if a reader panicked; keep capturing
                let mut guard = lines.lock().unwrap_or_else(|e| e.into_inner());
                guard.push(line.to_string());
                Ok(())
            }
        }
    }
}
