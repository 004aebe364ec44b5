use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::collection::{CollectionEvent, CollectionSnapshot, JobCollection};
use crate::confirmation::{Confirmation, ConfirmationKind, ConfirmationPort, ConfirmationRequest};
use crate::error::TransitionError;
use crate::notify::{Notification, Notifier, TracingNotifier};
use crate::repository::{Filters, JobRepository, Pagination, RepositoryError};
use crate::workflow::{Fields, Job, JobId, JobState, StateHistoryEntry, WorkflowDefinition, fields};

const STATE_UPDATED: &str = "Estado actualizado correctamente.";
const STATE_UPDATE_FAILED: &str = "No se pudo actualizar el estado.";
const DESCRIPTION_UPDATED: &str = "Descripción actualizada.";
const DESCRIPTION_UPDATE_FAILED: &str = "Error al actualizar la descripción.";
const LIST_FAILED: &str = "No se pudieron cargar los trabajos.";
const HISTORY_FAILED: &str = "No se pudo cargar el historial del trabajo.";

/// Successful end of a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The job stays active; carries its merged record.
    Updated(Job),
    /// The job reached DELIVERED and left the active collection.
    Delivered(JobId),
}

/// Field a target state cannot be entered without.
fn required_field(target: JobState) -> Option<&'static str> {
    match target {
        JobState::Stopped => Some(fields::DETENTION_REASON),
        JobState::InProgress => Some(fields::TECHNICIAN_ID),
        _ => None,
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Owns the active job list and is the only writer to it.
///
/// Every state change goes through [`request_transition`](Self::request_transition):
/// validate against the workflow, ask the user when the target needs it, claim the
/// job's in-flight marker, persist, then merge the result in one step. Operations on
/// different jobs may interleave freely; a second operation on a job that already has
/// one outstanding is rejected with [`TransitionError::Conflict`].
pub struct TransitionCoordinator<R, P, N = TracingNotifier> {
    repository: R,
    confirmations: P,
    notifier: N,
    collection: Mutex<JobCollection>,
}

impl<R, P, N> TransitionCoordinator<R, P, N>
where
    R: JobRepository,
    P: ConfirmationPort,
    N: Notifier,
{
    pub fn new(collection: JobCollection, repository: R, confirmations: P, notifier: N) -> Self {
        Self {
            repository,
            confirmations,
            notifier,
            collection: Mutex::new(collection),
        }
    }

    // Never held across an await.
    fn collection(&self) -> MutexGuard<'_, JobCollection> {
        self.collection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        self.collection().snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.collection().subscribe()
    }

    pub fn find(&self, id: JobId) -> Option<Job> {
        self.collection().find_by_id(id).cloned()
    }

    pub fn is_in_flight(&self, id: JobId) -> bool {
        self.collection().is_in_flight(id)
    }

    /// Moves job `id` to `target`.
    pub async fn request_transition(
        &self,
        id: JobId,
        target: JobState,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.request_transition_with(id, target, Fields::new()).await
    }

    /// Like [`request_transition`](Self::request_transition), with caller-supplied fields.
    ///
    /// Fields returned by the confirmation step are layered over `context`.
    #[instrument(skip_all, fields(job = %id, target = %target))]
    pub async fn request_transition_with(
        &self,
        id: JobId,
        target: JobState,
        mut context: Fields,
    ) -> Result<TransitionOutcome, TransitionError> {
        let job = self.admit(id, target)?;

        if let Some(kind) = ConfirmationKind::for_target(target) {
            let request = ConfirmationRequest { job: &job, target };
            match self.confirmations.request(kind, &request).await {
                Confirmation::Provided(extra) => context.extend(extra),
                Confirmation::Cancelled => {
                    debug!(?kind, "confirmation cancelled");
                    return Err(TransitionError::Cancelled);
                }
            }
        }
        for key in fields::RESERVED {
            context.remove(key);
        }

        if let Some(field) = required_field(target)
            && !is_present(context.get(field))
        {
            return Err(TransitionError::MissingContext { target, field });
        }

        self.claim(id, target)?;

        let mut body = Fields::new();
        body.insert(fields::TARGET_STATE.to_string(), json!(target.as_str()));
        body.extend(context.clone());

        let persisted = self.repository.update_state(id, &body).await;
        let result = {
            let mut collection = self.collection();
            let result = persisted
                .map_err(TransitionError::from)
                .and_then(|echo| apply_transition(&mut collection, &job, target, &echo, &context));
            collection.clear_in_flight(id);
            result
        };

        match &result {
            Ok(_) => {
                info!(from = %job.current_state, "transition persisted");
                self.notifier.notify(Notification::positive(STATE_UPDATED));
            }
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "transition failed");
                let detail = match err {
                    TransitionError::Persistence(e) => e.detail(),
                    _ => None,
                };
                self.notifier
                    .notify(Notification::negative(STATE_UPDATE_FAILED, detail));
            }
        }
        result
    }

    /// Checks that the move is legal and that nothing else is running for the job.
    fn admit(&self, id: JobId, target: JobState) -> Result<Job, TransitionError> {
        let collection = self.collection();
        let job = collection
            .find_by_id(id)
            .ok_or(TransitionError::JobNotFound(id))?;
        if !WorkflowDefinition::can_transition(job.current_state, target) {
            return Err(TransitionError::Validation {
                from: job.current_state,
                to: target,
            });
        }
        if collection.is_in_flight(id) {
            return Err(TransitionError::Conflict(id));
        }
        Ok(job.clone())
    }

    /// Sets the in-flight marker, re-checking the move: the job may have changed
    /// while the user was answering.
    fn claim(&self, id: JobId, target: JobState) -> Result<(), TransitionError> {
        let mut collection = self.collection();
        let current = collection
            .find_by_id(id)
            .map(|job| job.current_state)
            .ok_or(TransitionError::JobNotFound(id))?;
        if !WorkflowDefinition::can_transition(current, target) {
            return Err(TransitionError::Validation {
                from: current,
                to: target,
            });
        }
        if !collection.mark_in_flight(id) {
            return Err(TransitionError::Conflict(id));
        }
        Ok(())
    }

    /// Replaces the free-text description of a job.
    #[instrument(skip_all, fields(job = %id))]
    pub async fn update_description(
        &self,
        id: JobId,
        description: &str,
    ) -> Result<Job, TransitionError> {
        let admitted = {
            let mut collection = self.collection();
            let job = collection
                .find_by_id(id)
                .cloned()
                .ok_or(TransitionError::JobNotFound(id))?;
            if !collection.mark_in_flight(id) {
                return Err(TransitionError::Conflict(id));
            }
            job
        };

        let mut patch = Fields::new();
        patch.insert(fields::DESCRIPTION.to_string(), json!(description));

        let persisted = self.repository.update_details(id, &patch).await;
        let result = {
            let mut collection = self.collection();
            let result = persisted.map_err(TransitionError::from).and_then(|echo| {
                // Saved on the server even if a reload dropped the job meanwhile.
                let listed = collection.find_by_id(id).cloned();
                let merged = listed
                    .as_ref()
                    .unwrap_or(&admitted)
                    .merged(&echo, &patch)
                    .map_err(RepositoryError::from)?;
                if listed.is_some() {
                    collection.replace(merged.clone());
                } else {
                    debug!("job left the list before the update landed");
                }
                Ok(merged)
            });
            collection.clear_in_flight(id);
            result
        };

        match &result {
            Ok(_) => self.notifier.notify(Notification::positive(DESCRIPTION_UPDATED)),
            Err(err) => {
                warn!(error = %err, kind = %err.kind(), "description update failed");
                let detail = match err {
                    TransitionError::Persistence(e) => e.detail(),
                    _ => None,
                };
                self.notifier
                    .notify(Notification::negative(DESCRIPTION_UPDATE_FAILED, detail));
            }
        }
        result
    }

    /// Reloads the active list with the current filters and pagination.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<(), RepositoryError> {
        let (filters, pagination) = {
            let collection = self.collection();
            (collection.filters().clone(), collection.pagination().clone())
        };
        match self.repository.list(&filters, &pagination).await {
            Ok(page) => {
                debug!(items = page.items.len(), total = page.total, "jobs loaded");
                self.collection().load(page);
                Ok(())
            }
            Err(err) => {
                if !err.is_unauthorized() {
                    warn!(error = %err, "listing failed");
                    self.notifier.notify(Notification::negative(LIST_FAILED, None));
                }
                Err(err)
            }
        }
    }

    pub fn pagination(&self) -> Pagination {
        self.collection().pagination().clone()
    }

    pub fn filters(&self) -> Filters {
        self.collection().filters().clone()
    }

    /// Replaces filters and pagination together, then reloads once.
    pub async fn set_query(
        &self,
        filters: Filters,
        pagination: Pagination,
    ) -> Result<(), RepositoryError> {
        {
            let mut collection = self.collection();
            collection.set_filters(filters);
            collection.set_pagination(pagination);
        }
        self.refresh().await
    }

    pub async fn set_filters(&self, filters: Filters) -> Result<(), RepositoryError> {
        self.collection().set_filters(filters);
        self.refresh().await
    }

    pub async fn clear_filters(&self) -> Result<(), RepositoryError> {
        self.set_filters(Filters::default()).await
    }

    pub async fn set_pagination(&self, pagination: Pagination) -> Result<(), RepositoryError> {
        self.collection().set_pagination(pagination);
        self.refresh().await
    }

    /// Loads the state history of a job and attaches it when the job is in the list.
    pub async fn fetch_history(
        &self,
        id: JobId,
    ) -> Result<Vec<StateHistoryEntry>, RepositoryError> {
        match self.repository.history(id).await {
            Ok(history) => {
                self.collection().set_history(id, history.clone());
                Ok(history)
            }
            Err(err) => {
                if !err.is_unauthorized() {
                    self.notifier.notify(Notification::negative(HISTORY_FAILED, None));
                }
                Err(err)
            }
        }
    }
}

/// Final step of a persisted transition; runs under the collection lock.
fn apply_transition(
    collection: &mut JobCollection,
    admitted: &Job,
    target: JobState,
    echo: &Fields,
    context: &Fields,
) -> Result<TransitionOutcome, TransitionError> {
    if target == JobState::Delivered {
        if collection.remove(admitted.id).is_some() {
            collection.decrement_total();
        }
        return Ok(TransitionOutcome::Delivered(admitted.id));
    }

    let local = collection.find_by_id(admitted.id).unwrap_or(admitted);
    let mut merged = local.merged(echo, context).map_err(RepositoryError::from)?;
    merged.current_state = target;
    collection.replace(merged.clone());
    Ok(TransitionOutcome::Updated(merged))
}
