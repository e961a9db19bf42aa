//! Evidence
//!
//! Records proving whether process state survived between invocations, and
//! the best-effort file I/O that writes and reads them back.

pub mod record;
pub mod store;

pub use record::EvidenceRecord;
pub use store::{append_to_all, inspect_all, AppendOutcome, EvidenceCheck};
