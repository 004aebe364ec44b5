use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The eight stages a repair job moves through in the shop.
///
/// Happy path: SCHEDULED → AWAITING_WORK → IN_PROGRESS → QUALITY_CHECK →
/// READY_FOR_DELIVERY → DELIVERED, with detours through STOPPED and IN_WASH.
/// Declaration order carries no meaning; only [`WorkflowDefinition`] orders states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[serde(rename = "agendado")]
    Scheduled,
    #[serde(rename = "espera de trabajo")]
    AwaitingWork,
    #[serde(rename = "en trabajo")]
    InProgress,
    #[serde(rename = "trabajo detenido")]
    Stopped,
    #[serde(rename = "en lavado")]
    InWash,
    #[serde(rename = "control de calidad")]
    QualityCheck,
    #[serde(rename = "listo para entrega")]
    ReadyForDelivery,
    #[serde(rename = "entregado al cliente")]
    Delivered,
}

impl JobState {
    pub const ALL: [JobState; 8] = [
        JobState::Scheduled,
        JobState::AwaitingWork,
        JobState::InProgress,
        JobState::Stopped,
        JobState::InWash,
        JobState::QualityCheck,
        JobState::ReadyForDelivery,
        JobState::Delivered,
    ];

    /// The string the backend stores for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Scheduled => "agendado",
            JobState::AwaitingWork => "espera de trabajo",
            JobState::InProgress => "en trabajo",
            JobState::Stopped => "trabajo detenido",
            JobState::InWash => "en lavado",
            JobState::QualityCheck => "control de calidad",
            JobState::ReadyForDelivery => "listo para entrega",
            JobState::Delivered => "entregado al cliente",
        }
    }

    pub fn is_terminal(&self) -> bool {
        WorkflowDefinition::next_states(*self).is_empty()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Raised when a raw string names no known workflow state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job state: {0:?}")]
pub struct UnknownState(pub String);

impl FromStr for JobState {
    type Err = UnknownState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

/// Tag returned for anything that is not a known state.
pub const DEFAULT_COLOR: &str = "primary";

/// Static workflow graph: legal moves and the display tag of every state.
///
/// Both tables are exhaustive matches, so a new [`JobState`] variant does not
/// compile until it has a color and a row in the transition table.
pub struct WorkflowDefinition;

impl WorkflowDefinition {
    pub fn color_of(state: JobState) -> &'static str {
        match state {
            JobState::Scheduled => "grey-7",
            JobState::AwaitingWork => "orange-8",
            JobState::InProgress => "blue-8",
            JobState::Stopped => "red-8",
            JobState::InWash => "light-blue-5",
            JobState::QualityCheck => "teal",
            JobState::ReadyForDelivery => "green-8",
            JobState::Delivered => "dark",
        }
    }

    /// Outgoing edges of `state`, in the order they are offered to the user.
    pub fn next_states(state: JobState) -> &'static [JobState] {
        use JobState::*;
        match state {
            Scheduled => &[AwaitingWork],
            AwaitingWork => &[InProgress, InWash],
            InProgress => &[Stopped, QualityCheck, InWash],
            Stopped => &[InProgress],
            InWash => &[QualityCheck],
            QualityCheck => &[ReadyForDelivery, InProgress],
            ReadyForDelivery => &[Delivered],
            Delivered => &[],
        }
    }

    pub fn can_transition(from: JobState, to: JobState) -> bool {
        Self::next_states(from).contains(&to)
    }

    /// Like [`color_of`](Self::color_of) but for unparsed input; never fails.
    pub fn color_of_raw(raw: &str) -> &'static str {
        raw.parse::<JobState>()
            .map(Self::color_of)
            .unwrap_or(DEFAULT_COLOR)
    }

    /// Like [`next_states`](Self::next_states) but for unparsed input; unknown → empty.
    pub fn next_states_of_raw(raw: &str) -> &'static [JobState] {
        raw.parse::<JobState>()
            .map(Self::next_states)
            .unwrap_or(&[])
    }
}
