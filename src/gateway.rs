//! Zone store gateway: the privileged fetch/store/resync boundary.
//!
//! [`HelperGateway`] shells out to a privileged helper (normally through
//! `sudo`) with one of three verbs and stages zone text through a working
//! file:
//!
//! ```text
//! fetch:  <helper...> NAMED_GET  <zone>   then read  working_file
//! store:  write working_file,  then <helper...> NAMED_SET  <zone>
//! resync: <helper...> NAMED_SYNC <zone>
//! ```
//!
//! The helper is expected to exit non-zero on failure and explain itself on
//! stderr. Failures are surfaced as-is; nothing here retries.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::ZoneError;
use crate::metrics::{self, Timer};

/// The three privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayOp {
    /// Stage the current zone text.
    Fetch,
    /// Push staged text back and reload.
    Store,
    /// Reload without content change.
    Resync,
}

impl GatewayOp {
    /// Verb passed to the helper.
    pub fn helper_verb(self) -> &'static str {
        match self {
            GatewayOp::Fetch => "NAMED_GET",
            GatewayOp::Store => "NAMED_SET",
            GatewayOp::Resync => "NAMED_SYNC",
        }
    }

    /// Metric/log label.
    pub fn as_str(self) -> &'static str {
        match self {
            GatewayOp::Fetch => "fetch",
            GatewayOp::Store => "store",
            GatewayOp::Resync => "resync",
        }
    }
}

impl fmt::Display for GatewayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the privileged boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The helper could not be started.
    #[error("failed to run `{command}`: {err}")]
    Spawn {
        /// Command line that failed.
        command: String,
        /// Underlying error.
        err: std::io::Error,
    },

    /// The helper ran and reported failure.
    #[error("{op} of zone {zone} failed ({status}): {stderr}")]
    Failed {
        /// Which operation.
        op: GatewayOp,
        /// Zone identifier.
        zone: String,
        /// Exit status as reported by the OS.
        status: String,
        /// Trimmed helper stderr.
        stderr: String,
    },

    /// The helper did not finish in time and was killed.
    #[error("{op} of zone {zone} timed out after {timeout:?}")]
    Timeout {
        /// Which operation.
        op: GatewayOp,
        /// Zone identifier.
        zone: String,
        /// Configured limit.
        timeout: Duration,
    },

    /// Reading or writing the working file failed.
    #[error("working file {}: {err}", .path.display())]
    WorkingFile {
        /// Working file path.
        path: PathBuf,
        /// Underlying error.
        err: std::io::Error,
    },

    /// The zone is not known to the store.
    #[error("zone {0} not found")]
    ZoneNotFound(String),
}

/// Privileged access to the authoritative zone store.
#[async_trait]
pub trait ZoneGateway: Send + Sync {
    /// Return the current text of `zone`.
    async fn fetch(&self, zone: &str) -> Result<String, GatewayError>;

    /// Replace the text of `zone` and trigger a reload.
    async fn store(&self, zone: &str, text: &str) -> Result<(), GatewayError>;

    /// Force a reload of `zone` without changing it.
    async fn resync(&self, zone: &str) -> Result<(), GatewayError>;
}

/// Gateway that invokes the privileged helper as a subprocess.
#[derive(Debug, Clone)]
pub struct HelperGateway {
    program: String,
    args: Vec<String>,
    working_file: PathBuf,
    timeout: Duration,
}

impl HelperGateway {
    /// Build a gateway from configuration.
    pub fn new(config: &GatewayConfig) -> Result<Self, ZoneError> {
        let (program, args) = config
            .helper
            .split_first()
            .ok_or_else(|| ZoneError::Config("gateway.helper must not be empty".to_string()))?;
        if config.helper_timeout_secs == 0 {
            return Err(ZoneError::Config(
                "gateway.helper_timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            working_file: config.working_file.clone(),
            timeout: Duration::from_secs(config.helper_timeout_secs),
        })
    }

    /// Path zone text is staged through.
    pub fn working_file(&self) -> &Path {
        &self.working_file
    }

    async fn run(&self, op: GatewayOp, zone: &str) -> Result<(), GatewayError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(op.helper_verb())
            .arg(zone)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(op = %op, zone, program = %self.program, "invoking helper");
        let timer = Timer::start();

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(output) => output,
            Err(_) => {
                metrics::record_gateway_op(op, false, timer.elapsed());
                warn!(op = %op, zone, timeout = ?self.timeout, "helper timed out");
                return Err(GatewayError::Timeout {
                    op,
                    zone: zone.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        let output = output.map_err(|err| {
            metrics::record_gateway_op(op, false, timer.elapsed());
            GatewayError::Spawn {
                command: self.command_line(op, zone),
                err,
            }
        })?;

        metrics::record_gateway_op(op, output.status.success(), timer.elapsed());

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(op = %op, zone, status = %output.status, %stderr, "helper failed");
            return Err(GatewayError::Failed {
                op,
                zone: zone.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        Ok(())
    }

    fn command_line(&self, op: GatewayOp, zone: &str) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.args.iter().map(String::as_str));
        parts.push(op.helper_verb());
        parts.push(zone);
        parts.join(" ")
    }

    fn working_file_error(&self, err: std::io::Error) -> GatewayError {
        GatewayError::WorkingFile {
            path: self.working_file.clone(),
            err,
        }
    }
}

#[async_trait]
impl ZoneGateway for HelperGateway {
    async fn fetch(&self, zone: &str) -> Result<String, GatewayError> {
        self.run(GatewayOp::Fetch, zone).await?;
        tokio::fs::read_to_string(&self.working_file)
            .await
            .map_err(|e| self.working_file_error(e))
    }

    async fn store(&self, zone: &str, text: &str) -> Result<(), GatewayError> {
        if let Some(parent) = self.working_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.working_file_error(e))?;
        }
        tokio::fs::write(&self.working_file, text)
            .await
            .map_err(|e| self.working_file_error(e))?;
        self.run(GatewayOp::Store, zone).await
    }

    async fn resync(&self, zone: &str) -> Result<(), GatewayError> {
        self.run(GatewayOp::Resync, zone).await
    }
}

/// In-process zone store, for tests and dry runs.
///
/// Counts every operation and can be told to fail stores or to delay fetches
/// (to widen race windows in concurrency tests).
#[derive(Debug, Default)]
pub struct MemoryGateway {
    zones: Mutex<HashMap<String, String>>,
    fetches: AtomicUsize,
    stores: AtomicUsize,
    resyncs: AtomicUsize,
    fail_stores: AtomicBool,
    fetch_delay: Option<Duration>,
}

impl MemoryGateway {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every fetch.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Set the text of a zone.
    pub fn put_zone(&self, zone: &str, text: impl Into<String>) {
        self.zones.lock().insert(zone.to_string(), text.into());
    }

    /// Current text of a zone.
    pub fn zone_text(&self, zone: &str) -> Option<String> {
        self.zones.lock().get(zone).cloned()
    }

    /// Make subsequent stores fail (or succeed again).
    pub fn fail_stores(&self, fail: bool) {
        self.fail_stores.store(fail, Ordering::SeqCst);
    }

    /// Number of fetches served.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of successful stores.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Number of resyncs served.
    pub fn resync_count(&self) -> usize {
        self.resyncs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ZoneGateway for MemoryGateway {
    async fn fetch(&self, zone: &str) -> Result<String, GatewayError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.zone_text(zone)
            .ok_or_else(|| GatewayError::ZoneNotFound(zone.to_string()))
    }

    async fn store(&self, zone: &str, text: &str) -> Result<(), GatewayError> {
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(GatewayError::Failed {
                op: GatewayOp::Store,
                zone: zone.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "permission denied".to_string(),
            });
        }
        let mut zones = self.zones.lock();
        if !zones.contains_key(zone) {
            return Err(GatewayError::ZoneNotFound(zone.to_string()));
        }
        zones.insert(zone.to_string(), text.to_string());
        self.stores.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resync(&self, zone: &str) -> Result<(), GatewayError> {
        if !self.zones.lock().contains_key(zone) {
            return Err(GatewayError::ZoneNotFound(zone.to_string()));
        }
        self.resyncs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Write a helper script; it is run through `sh` rather than executed
    /// directly.
    fn write_helper(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("helper.sh");
        std::fs::write(&path, format!("{}\n", body)).unwrap();
        path
    }

    fn config(dir: &Path, helper: &Path, timeout_secs: u64) -> GatewayConfig {
        GatewayConfig {
            helper: vec!["sh".to_string(), helper.display().to_string()],
            working_file: dir.join("work").join("named"),
            helper_timeout_secs: timeout_secs,
        }
    }

    #[test]
    fn test_empty_helper_is_rejected() {
        let config = GatewayConfig {
            helper: vec![],
            ..GatewayConfig::default()
        };
        assert!(matches!(HelperGateway::new(&config), Err(ZoneError::Config(_))));
    }

    #[tokio::test]
    async fn test_fetch_reads_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let helper = write_helper(
            dir.path(),
            &format!(
                "[ \"$1\" = NAMED_GET ] || exit 3\nprintf 'zone %s\\n' \"$2\" > {}/named",
                work.display()
            ),
        );
        let gateway = HelperGateway::new(&config(dir.path(), &helper, 5)).unwrap();

        let text = gateway.fetch("example.com").await.unwrap();
        assert_eq!(text, "zone example.com\n");
    }

    #[tokio::test]
    async fn test_store_writes_then_invokes_helper() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let helper = write_helper(dir.path(), &format!("echo \"$1 $2\" >> {}", log.display()));
        let gateway = HelperGateway::new(&config(dir.path(), &helper, 5)).unwrap();

        gateway.store("example.com", "new text\n").await.unwrap();
        gateway.resync("example.com").await.unwrap();

        let staged = std::fs::read_to_string(gateway.working_file()).unwrap();
        assert_eq!(staged, "new text\n");
        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls, "NAMED_SET example.com\nNAMED_SYNC example.com\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let helper = write_helper(dir.path(), "echo 'zone not found' >&2\nexit 2");
        let gateway = HelperGateway::new(&config(dir.path(), &helper, 5)).unwrap();

        let err = gateway.resync("missing.example").await.unwrap_err();
        match err {
            GatewayError::Failed {
                op, zone, stderr, ..
            } => {
                assert_eq!(op, GatewayOp::Resync);
                assert_eq!(zone, "missing.example");
                assert_eq!(stderr, "zone not found");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_helper_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatewayConfig {
            helper: vec![dir.path().join("does-not-exist").display().to_string()],
            ..config(dir.path(), dir.path(), 5)
        };
        let gateway = HelperGateway::new(&config).unwrap();

        let err = gateway.resync("example.com").await.unwrap_err();
        assert!(matches!(err, GatewayError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_slow_helper_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let helper = write_helper(dir.path(), "sleep 5");
        let gateway = HelperGateway::new(&config(dir.path(), &helper, 1)).unwrap();

        let err = gateway.resync("example.com").await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { op: GatewayOp::Resync, .. }));
    }

    #[tokio::test]
    async fn test_memory_gateway_counts_and_fails() {
        let gateway = MemoryGateway::new();
        gateway.put_zone("example.com", "text");

        assert_eq!(gateway.fetch("example.com").await.unwrap(), "text");
        assert!(matches!(
            gateway.fetch("other").await,
            Err(GatewayError::ZoneNotFound(_))
        ));

        gateway.fail_stores(true);
        assert!(gateway.store("example.com", "x").await.is_err());
        gateway.fail_stores(false);
        gateway.store("example.com", "x").await.unwrap();

        assert_eq!(gateway.fetch_count(), 2);
        assert_eq!(gateway.store_count(), 1);
        assert_eq!(gateway.zone_text("example.com").as_deref(), Some("x"));
    }
}
