//! Review subdomain: tasks, findings, verdicts, rosters and run state.

pub mod finding;
pub mod specialty;
pub mod state;
pub mod task;
pub mod verdict;

pub use finding::{Finding, FindingKind, Severity};
pub use specialty::{Specialty, SpecialtyProfile};
pub use state::{AggregateReport, ReviewState, SimilarTask, SpecialistState, StateUpdate};
pub use task::{Complexity, TaskMetadata};
pub use verdict::{OverallOutcome, Verdict, VerdictOutcome, aggregate_verdicts};
