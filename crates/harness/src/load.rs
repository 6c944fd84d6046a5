//! Background workload that keeps the manager busy during a fault.
//!
//! The generator is a child process (normally `vigil load`) that loops until
//! a stop file appears. Stopping creates the file and waits for the child to
//! notice; a child that ignores it is killed.

use std::future::Future;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use vigil_config::poll_async;

use crate::error::{HarnessError, Result};

/// Flag naming the stop file, appended to the child's arguments.
pub const STOP_FILE_FLAG: &str = "--stop-file";

/// A running load-generator process.
pub struct LoadGenerator {
    child: Child,
    stop_file: PathBuf,
    stderr_lines: Arc<Mutex<Vec<String>>>,
}

impl LoadGenerator {
    /// Start `program args... --stop-file <stop_file>`.
    pub fn spawn(program: &Path, args: &[String], stop_file: PathBuf) -> Result<Self> {
        if stop_file.exists() {
            std::fs::remove_file(&stop_file)?;
        }
        let mut child = Command::new(program)
            .args(args)
            .arg(STOP_FILE_FLAG)
            .arg(&stop_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        let stderr_lines = Arc::new(Mutex::new(Vec::new()));
        if let Some(stderr) = child.stderr.take() {
            let lines = Arc::clone(&stderr_lines);
            std::thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(std::io::Result::ok) {
                    lines.lock().push(line);
                }
            });
        }
        tracing::info!(pid = child.id(), program = %program.display(), "load generator started");
        Ok(Self { child, stop_file, stderr_lines })
    }

    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Captured stderr so far.
    pub fn stderr(&self) -> String {
        self.stderr_lines.lock().join("\n")
    }

    /// Signal the generator through its stop file and wait up to `grace`
    /// for it to exit. Kills it and returns `Timeout` otherwise.
    pub async fn stop(mut self, grace: Duration) -> Result<ExitStatus> {
        std::fs::write(&self.stop_file, b"stop")?;
        let exited = poll_async(|| std::future::ready(!matches!(self.child.try_wait(), Ok(None))))
            .timeout(grace)
            .every(Duration::from_millis(50))
            .expect("load generator to stop")
            .check()
            .await;
        match (exited, self.child.try_wait()?) {
            (Ok(()), Some(status)) => {
                tracing::info!(%status, "load generator stopped");
                Ok(status)
            }
            (result, _) => {
                let _ = self.child.kill();
                let _ = self.child.wait();
                let elapsed = result.err().map_or(grace, |t| t.elapsed);
                Err(HarnessError::Timeout { what: "load generator to stop".to_owned(), elapsed })
            }
        }
    }
}

impl Drop for LoadGenerator {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Totals reported by `run_until_stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub iterations: u64,
    pub failures: u64,
}

/// The generator side: run `iteration` every `interval` until `stop_file`
/// exists. Failed iterations are counted and logged, never fatal.
pub async fn run_until_stopped<F, Fut>(
    stop_file: &Path,
    interval: Duration,
    mut iteration: F,
) -> LoadStats
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut stats = LoadStats::default();
    while !stop_file.exists() {
        stats.iterations += 1;
        if let Err(e) = iteration().await {
            stats.failures += 1;
            tracing::warn!(iteration = stats.iterations, "load iteration failed: {e}");
        }
        tokio::time::sleep(interval).await;
    }
    tracing::info!(iterations = stats.iterations, failures = stats.failures, "load stopped");
    stats
}
