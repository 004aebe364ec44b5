//! The human in the loop.
//!
//! Some moves need input before they can be persisted: why a job is being
//! stopped, which technician picks it up, or a plain "yes, it was handed over".
//! The coordinator asks through a [`ConfirmationPort`] and either gets the
//! extra fields back or learns that the user cancelled.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::eta::{Clock, ETA_FORMAT, EtaCalculator};
use crate::workflow::{Fields, Job, JobState, fields};

/// What the user is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationKind {
    /// Reason (and possibly an ETA) for stopping work.
    DetentionReason,
    /// Technician who will work on the job.
    AssignTechnician,
    /// Yes/no before handing the vehicle back to the customer.
    ConfirmDelivery,
}

impl ConfirmationKind {
    /// The confirmation a move into `target` requires, if any.
    pub fn for_target(target: JobState) -> Option<Self> {
        match target {
            JobState::Stopped => Some(ConfirmationKind::DetentionReason),
            JobState::InProgress => Some(ConfirmationKind::AssignTechnician),
            JobState::Delivered => Some(ConfirmationKind::ConfirmDelivery),
            JobState::Scheduled
            | JobState::AwaitingWork
            | JobState::InWash
            | JobState::QualityCheck
            | JobState::ReadyForDelivery => None,
        }
    }
}

/// Context handed to the port: the job as it is now and where it is going.
#[derive(Debug, Clone, Copy)]
pub struct ConfirmationRequest<'a> {
    pub job: &'a Job,
    pub target: JobState,
}

/// Answer from the port.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// Approved, with the extra fields to send along (empty for plain approvals).
    Provided(Fields),
    Cancelled,
}

impl Confirmation {
    pub fn approved() -> Self {
        Confirmation::Provided(Fields::new())
    }
}

/// Asks a human; suspends until they answer.
#[allow(async_fn_in_trait)]
pub trait ConfirmationPort {
    async fn request(
        &self,
        kind: ConfirmationKind,
        request: &ConfirmationRequest<'_>,
    ) -> Confirmation;
}

impl<P: ConfirmationPort + ?Sized> ConfirmationPort for &P {
    async fn request(
        &self,
        kind: ConfirmationKind,
        request: &ConfirmationRequest<'_>,
    ) -> Confirmation {
        (**self).request(kind, request).await
    }
}

/// Why work on a job was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetentionReason {
    /// Waiting for the customer to approve a quote.
    CustomerApproval,
    /// Waiting for a part that had to be ordered.
    PartsOnOrder,
    Other,
}

impl DetentionReason {
    pub const ALL: [DetentionReason; 3] = [
        DetentionReason::CustomerApproval,
        DetentionReason::PartsOnOrder,
        DetentionReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetentionReason::CustomerApproval => "aprobacion del cliente",
            DetentionReason::PartsOnOrder => "repuestos a pedido",
            DetentionReason::Other => "otro",
        }
    }
}

impl fmt::Display for DetentionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetentionReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DetentionReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| format!("unknown detention reason: {s:?}"))
    }
}

/// Payload for a move into STOPPED.
///
/// Approval and parts detentions carry an ETA, written both to the history
/// entry and to the job so overdue alerts can fire.
pub fn detention_context<C: Clock>(
    reason: DetentionReason,
    detail: Option<&str>,
    eta: &EtaCalculator<C>,
) -> Fields {
    let mut context = Fields::new();
    context.insert(fields::DETENTION_REASON.into(), json!(reason.as_str()));
    if let Some(detail) = detail.filter(|d| !d.trim().is_empty()) {
        context.insert(fields::DETENTION_DETAIL.into(), json!(detail));
    }

    let due = match reason {
        DetentionReason::CustomerApproval => Some(eta.approval_eta()),
        DetentionReason::PartsOnOrder => Some(eta.replacement_part_eta()),
        DetentionReason::Other => None,
    };
    if let Some(due) = due {
        let formatted = due.format(ETA_FORMAT).to_string();
        context.insert(fields::HISTORY_ETA.into(), json!(formatted));
        context.insert(fields::ETA.into(), json!(formatted));
        context.insert(fields::ETA_REASON.into(), json!(reason.as_str()));
    }
    context
}

/// Payload for a move into IN_PROGRESS.
pub fn technician_context(technician_id: u64) -> Fields {
    let mut context = Fields::new();
    context.insert(fields::TECHNICIAN_ID.into(), json!(technician_id));
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eta::FixedClock;
    use chrono::NaiveDate;

    fn monday_morning() -> EtaCalculator<FixedClock> {
        let now = NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        EtaCalculator::new(FixedClock(now))
    }

    #[test]
    fn only_three_targets_need_confirmation() {
        let needing: Vec<_> = JobState::ALL
            .into_iter()
            .filter_map(ConfirmationKind::for_target)
            .collect();
        assert_eq!(
            needing,
            vec![
                ConfirmationKind::AssignTechnician,
                ConfirmationKind::DetentionReason,
                ConfirmationKind::ConfirmDelivery,
            ]
        );
    }

    #[test]
    fn parts_detention_carries_part_eta() {
        let context = detention_context(
            DetentionReason::PartsOnOrder,
            Some("bomba de agua"),
            &monday_morning(),
        );
        assert_eq!(context[fields::DETENTION_REASON], json!("repuestos a pedido"));
        assert_eq!(context[fields::DETENTION_DETAIL], json!("bomba de agua"));
        assert_eq!(context[fields::ETA], json!("2026-10-14T11:00:00"));
        assert_eq!(context[fields::HISTORY_ETA], json!("2026-10-14T11:00:00"));
        assert_eq!(context[fields::ETA_REASON], json!("repuestos a pedido"));
    }

    #[test]
    fn approval_detention_keeps_time_of_day() {
        let context = detention_context(DetentionReason::CustomerApproval, None, &monday_morning());
        assert_eq!(context[fields::ETA], json!("2026-10-14T10:00:00"));
        assert!(!context.contains_key(fields::DETENTION_DETAIL));
    }

    #[test]
    fn other_detention_has_no_eta() {
        let context = detention_context(DetentionReason::Other, Some("  "), &monday_morning());
        assert_eq!(context.len(), 1);
        assert_eq!(context[fields::DETENTION_REASON], json!("otro"));
    }

    #[test]
    fn detention_reason_parses_its_own_strings() {
        for reason in DetentionReason::ALL {
            assert_eq!(reason.as_str().parse::<DetentionReason>().unwrap(), reason);
        }
        assert!("por capricho".parse::<DetentionReason>().is_err());
    }
}
