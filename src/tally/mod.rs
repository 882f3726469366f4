//! Attendance and vote aggregation.
//!
//! Everything here is synchronous and pure: callers pass in the agenda list,
//! attendance records and roster size, and get derived figures back. Missing
//! meeting context never errors; it yields zeroed structures.

pub mod balance;
pub mod context;
pub mod declaration;
pub mod passage;
pub mod quorum;
pub mod snapshot;
pub mod stats;

pub use balance::{VoteField, auto_balance, edit_votes};
pub use context::{assign_meeting_ids, items_of_meeting, resolve_meeting_context};
pub use declaration::{DeclarationDraft, generate_declaration, threshold_phrase};
pub use passage::compute_passage;
pub use quorum::{QuorumStatus, compute_quorum, percent};
pub use snapshot::{EffectiveTally, confirm_snapshot, effective_tally, reset_snapshot};
pub use stats::{MeetingStats, StatsCache, compute_meeting_stats, written_ballot_counts};
