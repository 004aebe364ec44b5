//! Job-workflow engine for a repair shop.
//!
//! Jobs move through a fixed workflow (intake, work, wash, quality check,
//! delivery). [`workflow`] holds the transition table, [`eta`] the business-day
//! rules, and [`coordinator`] guards, confirms, persists and merges every state
//! change against the backend reached through [`repository`].

pub mod cli;
pub mod collection;
pub mod config;
pub mod confirmation;
pub mod coordinator;
pub mod error;
pub mod eta;
pub mod notify;
pub mod repository;
pub mod telemetry;
pub mod ui;
pub mod workflow;

pub use collection::{CollectionEvent, CollectionSnapshot, JobCollection};
pub use confirmation::{Confirmation, ConfirmationKind, ConfirmationPort, ConfirmationRequest};
pub use coordinator::{TransitionCoordinator, TransitionOutcome};
pub use error::{ErrorKind, TransitionError};
pub use eta::{Clock, EtaCalculator, FixedClock, SystemClock};
pub use repository::{HttpJobRepository, JobRepository, RepositoryError};
pub use workflow::{Job, JobId, JobState, WorkflowDefinition};
