//! Asynchronous roster import pipeline: CSV parsing, candidate matching,
//! the per-session row ledger, bundle splitting, and the worker that drives
//! one batch end to end.

pub mod bundle;
pub mod documents;
pub mod matching;
pub mod memory;
pub mod repository;
pub mod roster;
pub mod router;
pub mod service;
pub mod session;
pub mod worker;

#[cfg(test)]
mod tests;

pub use bundle::{
    split_bundle, BundleSplitError, SplitEntry, SplitFailure, SplitOutcome, SplitProgressUpdate,
};
pub use documents::{DocumentMatchStatus, ImportDocument};
pub use matching::{
    classify_row, match_document, normalize_name, DocumentMatch, MatchConfidence, MatchMethod,
    RosterMatch,
};
pub use memory::{InMemoryDocumentStore, InMemoryImportStore, InMemoryProgressionNotifier};
pub use repository::{
    DocumentStore, DocumentStoreError, ImportCommit, ImportStore, NotifyError,
    ProgressionNotifier, ProgressionUpdate, StoreError,
};
pub use roster::{CsvRosterReader, HeaderSynonyms, RosterParseError, RosterReader, RosterRow};
pub use router::import_router;
pub use service::{
    BundleSplitReport, CandidateView, DocumentView, ImportService, ImportServiceError,
    OutcomeView, RecordOutcomeCommand, RowResultView, SessionView, SplitFailureView,
};
pub use session::{
    ImportSession, MatchResolution, RowAction, RowResult, SessionError, SessionStatus,
    SessionTallies, SplitProgress, MAX_FAILURE_REASON_CHARS,
};
pub use worker::{ImportQueue, ImportRequest, ImportWorker, QueueClosed};
