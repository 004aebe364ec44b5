use thiserror::Error;

use crate::repository::RepositoryError;
use crate::workflow::{JobId, JobState};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Transition not allowed from '{from}' to '{to}'")]
    Validation { from: JobState, to: JobState },

    #[error("Moving to '{target}' requires '{field}'")]
    MissingContext {
        target: JobState,
        field: &'static str,
    },

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error("A change is already in progress for job {0}")]
    Conflict(JobId),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Could not persist change: {0}")]
    Persistence(#[from] RepositoryError),
}

/// Coarse classification that decides how a failure is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Illegal or incomplete request; rejected before any side effect.
    Validation,
    /// Duplicate request for a job that is already being changed.
    Conflict,
    /// The user backed out; callers revert silently.
    Cancellation,
    /// The backend failed; the user is told.
    Persistence,
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransitionError::Validation { .. }
            | TransitionError::MissingContext { .. }
            | TransitionError::JobNotFound(_) => ErrorKind::Validation,
            TransitionError::Conflict(_) => ErrorKind::Conflict,
            TransitionError::Cancelled => ErrorKind::Cancellation,
            TransitionError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// Only backend failures raise a failure notification.
    pub fn notifies_user(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancellation
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "Validation"),
            ErrorKind::Conflict => write!(f, "Conflict"),
            ErrorKind::Cancellation => write!(f, "Cancellation"),
            ErrorKind::Persistence => write!(f, "Persistence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels_are_stable_log_values() {
        let persistence = TransitionError::from(RepositoryError::Server {
            status: 503,
            detail: None,
        });
        assert_eq!(persistence.kind().to_string(), "Persistence");
        assert_eq!(TransitionError::Conflict(JobId(3)).kind().to_string(), "Conflict");
        assert_eq!(TransitionError::Cancelled.kind().to_string(), "Cancellation");
    }

    #[test]
    fn only_persistence_failures_notify() {
        let persistence = TransitionError::from(RepositoryError::Server {
            status: 500,
            detail: None,
        });
        assert!(persistence.notifies_user());
        assert!(!TransitionError::Cancelled.notifies_user());
        assert!(!TransitionError::Conflict(JobId(1)).notifies_user());
        assert!(
            !TransitionError::Validation {
                from: JobState::Scheduled,
                to: JobState::Delivered
            }
            .notifies_user()
        );
    }

    #[test]
    fn validation_family_shares_a_kind() {
        assert_eq!(TransitionError::JobNotFound(JobId(4)).kind(), ErrorKind::Validation);
        assert_eq!(
            TransitionError::MissingContext {
                target: JobState::Stopped,
                field: "motivo_detencion"
            }
            .kind(),
            ErrorKind::Validation
        );
        assert!(TransitionError::Cancelled.is_cancelled());
    }

    #[test]
    fn messages_name_the_states() {
        let err = TransitionError::Validation {
            from: JobState::InWash,
            to: JobState::AwaitingWork,
        };
        assert_eq!(
            err.to_string(),
            "Transition not allowed from 'en lavado' to 'espera de trabajo'"
        );
    }
}
