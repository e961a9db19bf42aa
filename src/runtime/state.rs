/// Process-wide diagnostic state
///
/// One instance lives for the whole process. The host creates it, injects it
/// into every invocation, and never tears it down: the leak collections only
/// ever grow, which is exactly what the reuse fixture is probing for.
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Instant;
use uuid::Uuid;

/// Sizes of the three leak collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LeakCounts {
    pub streams: usize,
    pub writers: usize,
    pub readers: usize,
}

impl LeakCounts {
    pub fn total(&self) -> usize {
        self.streams + self.writers + self.readers
    }
}

pub struct ProcessState {
    process_id: Uuid,
    invocations: u64,
    first_invocation: Option<(Instant, DateTime<Utc>)>,
    leaked_streams: Vec<File>,
    leaked_writers: Vec<BufWriter<File>>,
    leaked_readers: Vec<BufReader<File>>,
    retained_memory: Vec<Box<[u8]>>,
}

impl ProcessState {
    pub fn new() -> Self {
        Self {
            process_id: Uuid::new_v4(),
            invocations: 0,
            first_invocation: None,
            leaked_streams: Vec::new(),
            leaked_writers: Vec::new(),
            leaked_readers: Vec::new(),
            retained_memory: Vec::new(),
        }
    }

    /// Identifier fixed for the lifetime of this state
    pub fn process_id(&self) -> Uuid {
        self.process_id
    }

    /// Count a new invocation and return its 1-based number
    ///
    /// The first call also stamps the first-invocation time.
    pub fn begin_invocation(&mut self) -> u64 {
        self.invocations += 1;
        if self.first_invocation.is_none() {
            self.first_invocation = Some((Instant::now(), Utc::now()));
        }
        self.invocations
    }

    pub fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Milliseconds since the first invocation (0 before any call)
    pub fn age_ms(&self) -> u64 {
        self.first_invocation
            .map(|(started, _)| started.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn first_invocation_at(&self) -> Option<DateTime<Utc>> {
        self.first_invocation.map(|(_, at)| at)
    }

    // The push_* methods take ownership and never hand the value back: the
    // handles stay open until the process dies.

    pub fn push_stream(&mut self, stream: File) {
        self.leaked_streams.push(stream);
    }

    pub fn push_writer(&mut self, writer: BufWriter<File>) {
        self.leaked_writers.push(writer);
    }

    pub fn push_reader(&mut self, reader: BufReader<File>) {
        self.leaked_readers.push(reader);
    }

    pub fn retain_memory(&mut self, block: Box<[u8]>) {
        self.retained_memory.push(block);
    }

    pub fn leak_counts(&self) -> LeakCounts {
        LeakCounts {
            streams: self.leaked_streams.len(),
            writers: self.leaked_writers.len(),
            readers: self.leaked_readers.len(),
        }
    }

    /// Bytes held by retained memory blocks
    pub fn retained_bytes(&self) -> usize {
        self.retained_memory.iter().map(|block| block.len()).sum()
    }
}

impl Default for ProcessState {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ProcessState {
    fn drop(&mut self) {
        // Intentional leak: dropping the state must not close the handles or
        // flush the writers, so the collections are forgotten, not dropped.
        std::mem::forget(std::mem::take(&mut self.leaked_streams));
        std::mem::forget(std::mem::take(&mut self.leaked_writers));
        std::mem::forget(std::mem::take(&mut self.leaked_readers));
        std::mem::forget(std::mem::take(&mut self.retained_memory));
    }
}

impl std::fmt::Debug for ProcessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessState")
            .field("process_id", &self.process_id)
            .field("invocations", &self.invocations)
            .field("leaks", &self.leak_counts())
            .field("retained_bytes", &self.retained_bytes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fresh_state() {
        let state = ProcessState::new();
        assert_eq!(state.invocations(), 0);
        assert_eq!(state.age_ms(), 0);
        assert!(state.first_invocation_at().is_none());
        assert_eq!(state.leak_counts().total(), 0);
    }

    #[test]
    fn test_counter_and_age() {
        let mut state = ProcessState::new();
        assert_eq!(state.begin_invocation(), 1);
        let first = state.first_invocation_at();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(state.begin_invocation(), 2);
        assert_eq!(state.first_invocation_at(), first);
        assert!(state.age_ms() >= 20);
    }

    #[test]
    fn test_process_id_is_per_state() {
        let a = ProcessState::new();
        let b = ProcessState::new();
        assert_ne!(a.process_id(), b.process_id());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_drop_keeps_handles_open_and_writers_unflushed() {
        use crate::utils::fd_census::fds_pointing_at;
        use std::io::Write;

        let dir = std::env::temp_dir()
            .join(format!("lambda_probe_state_drop_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let stream_path = dir.join("stream.txt");
        let writer_path = dir.join("writer.txt");

        let mut state = ProcessState::new();
        state.push_stream(File::create(&stream_path).unwrap());
        let mut writer = BufWriter::new(File::create(&writer_path).unwrap());
        writeln!(writer, "buffered").unwrap();
        state.push_writer(writer);

        drop(state);

        assert_eq!(std::fs::read_to_string(&writer_path).unwrap(), "");
        assert_eq!(fds_pointing_at(&stream_path).unwrap().len(), 1);
        assert_eq!(fds_pointing_at(&writer_path).unwrap().len(), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_retained_memory_accumulates() {
        let mut state = ProcessState::new();
        state.retain_memory(vec![0u8; 64].into_boxed_slice());
        state.retain_memory(vec![0u8; 64].into_boxed_slice());
        assert_eq!(state.retained_bytes(), 128);
        // Memory blocks are not counted as leaked handles
        assert_eq!(state.leak_counts().total(), 0);
    }
}
