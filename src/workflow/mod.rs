mod job;
mod state;

pub use job::{Fields, Job, JobId, StateHistoryEntry, fields, merge_fields};
pub use state::{DEFAULT_COLOR, JobState, UnknownState, WorkflowDefinition};
