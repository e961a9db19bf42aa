/// Reuse-evidence fixture
///
/// Every call leaks one output stream, one buffered writer, one buffered
/// reader and a fixed memory block into the injected process state, then
/// appends an evidence line to each candidate path and reads back whatever
/// earlier calls (or earlier processes) left behind. If the host reuses the
/// process, the counters keep climbing and the leak collections keep growing.
use crate::config::config::ProbeConfig;
use crate::config::types::{FixtureKind, InvocationContext};
use crate::evidence::{append_to_all, inspect_all, AppendOutcome, EvidenceCheck, EvidenceRecord};
use crate::handler::Handler;
use crate::runtime::state::{LeakCounts, ProcessState};
use crate::utils::fd_census;
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use uuid::Uuid;

/// Byte written into every retained memory block so the pages are resident
const MEMORY_FILL: u8 = 0xA5;

/// Everything one reuse invocation observed
#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub process_id: Uuid,
    pub os_pid: u32,
    pub invocation: u64,
    pub age_ms: u64,
    pub request_id: String,
    pub remaining_time_ms: u64,
    pub leaks: LeakCounts,
    pub retained_bytes: usize,
    pub open_fds: Option<usize>,
    pub appends: Vec<AppendOutcome>,
    pub checks: Vec<EvidenceCheck>,
}

impl InvocationReport {
    pub fn leaked_resources(&self) -> usize {
        self.leaks.total()
    }
}

impl std::fmt::Display for InvocationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Process {}: invocation #{}, age {}ms, request {}, leaked resources {}",
            self.process_id,
            self.invocation,
            self.age_ms,
            self.request_id,
            self.leaked_resources()
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReuseHandler {
    leak_dir: PathBuf,
    memory_block_bytes: usize,
    evidence_paths: Vec<PathBuf>,
    check_paths: Vec<PathBuf>,
}

impl ReuseHandler {
    pub fn new(
        leak_dir: impl Into<PathBuf>,
        memory_block_bytes: usize,
        evidence_paths: Vec<PathBuf>,
        check_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            leak_dir: leak_dir.into(),
            memory_block_bytes,
            evidence_paths,
            check_paths,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(
            config.leak_dir.clone(),
            config.memory_block_bytes,
            config.evidence_paths.clone(),
            config.check_paths.clone(),
        )
    }

    /// Run one invocation and return the structured report
    pub fn invoke(&self, ctx: &InvocationContext, state: &mut ProcessState) -> InvocationReport {
        let invocation = state.begin_invocation();
        let age_ms = state.age_ms();
        let os_pid = std::process::id();
        let remaining_time_ms = ctx.remaining_time_ms();

        info!(
            "Process {} (pid {}) invocation #{} age {}ms request_id={} remaining_time_ms={}",
            state.process_id(),
            os_pid,
            invocation,
            age_ms,
            ctx.request_id,
            remaining_time_ms
        );

        self.leak_resources(invocation, state);

        let leaks = state.leak_counts();
        let record = EvidenceRecord {
            timestamp: Utc::now(),
            os_pid,
            process_id: state.process_id(),
            invocation,
            request_id: ctx.request_id.clone(),
            age_ms,
            leaked_resources: leaks.total(),
        };
        let appends = append_to_all(&self.evidence_paths, &record.to_line());
        let checks = inspect_all(&self.check_paths);

        let open_fds = fd_census::open_fd_count();
        info!(
            "Leak collections: streams={} writers={} readers={} retained_bytes={} open_fds={:?}",
            leaks.streams,
            leaks.writers,
            leaks.readers,
            state.retained_bytes(),
            open_fds
        );

        InvocationReport {
            process_id: state.process_id(),
            os_pid,
            invocation,
            age_ms,
            request_id: ctx.request_id.clone(),
            remaining_time_ms,
            leaks,
            retained_bytes: state.retained_bytes(),
            open_fds,
            appends,
            checks,
        }
    }

    // Nothing acquired here is closed. Each resource is moved into the state
    // and stays open for the rest of the process lifetime.
    fn leak_resources(&self, invocation: u64, state: &mut ProcessState) {
        let stream_path = self.leak_dir.join(format!("leaked_stream_{}.txt", invocation));
        match File::create(&stream_path) {
            Ok(mut stream) => {
                if let Err(e) = writeln!(stream, "leaked stream from invocation {}", invocation) {
                    warn!("Failed to write leaked stream {}: {}", stream_path.display(), e);
                }
                state.push_stream(stream);
            }
            Err(e) => warn!("Failed to create leaked stream {}: {}", stream_path.display(), e),
        }

        let writer_path = self.leak_dir.join(format!("leaked_writer_{}.txt", invocation));
        match File::create(&writer_path) {
            Ok(file) => {
                let mut writer = BufWriter::new(file);
                // Left in the buffer on purpose; the writer is never flushed.
                if let Err(e) = writeln!(writer, "leaked writer from invocation {}", invocation) {
                    warn!("Failed to write leaked writer {}: {}", writer_path.display(), e);
                }
                state.push_writer(writer);
            }
            Err(e) => warn!("Failed to create leaked writer {}: {}", writer_path.display(), e),
        }

        let reader_path = self.leak_dir.join(format!("leaked_reader_{}.txt", invocation));
        let source = format!("reader source for invocation {}\n", invocation);
        // The source file is written and closed before the leaked handle opens it.
        match fs::write(&reader_path, source).and_then(|()| File::open(&reader_path)) {
            Ok(file) => {
                let mut reader = BufReader::new(file);
                let mut first_line = String::new();
                if let Err(e) = reader.read_line(&mut first_line) {
                    warn!("Failed to read leaked reader {}: {}", reader_path.display(), e);
                }
                state.push_reader(reader);
            }
            Err(e) => warn!("Failed to create leaked reader {}: {}", reader_path.display(), e),
        }

        state.retain_memory(vec![MEMORY_FILL; self.memory_block_bytes].into_boxed_slice());
    }
}

impl Handler for ReuseHandler {
    fn kind(&self) -> FixtureKind {
        FixtureKind::Reuse
    }

    fn handle(&self, _input: &Value, ctx: &InvocationContext, state: &mut ProcessState) -> String {
        self.invoke(ctx, state).to_string()
    }
}
