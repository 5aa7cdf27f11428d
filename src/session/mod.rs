//! Session state, phase rules, and the session store.

mod rules;
mod state;
mod store;

pub use rules::{PhasePreset, PhaseRules};
pub use state::{InterviewPhase, QaRecord, RedFlag, RoundKind, Session};
pub use store::{FsSnapshotStore, MemorySnapshotStore, SessionStore, SnapshotStore};
