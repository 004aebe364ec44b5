//! In-memory list of active jobs.
//!
//! Storage and lookup only. Writes are crate-private: they happen through the
//! [`TransitionCoordinator`](crate::coordinator::TransitionCoordinator), and
//! observers learn about them through [`CollectionEvent`]s or a [`CollectionSnapshot`].

use std::collections::{BTreeSet, HashSet};

use tokio::sync::broadcast;

use crate::repository::{Filters, JobPage, Pagination};
use crate::workflow::{Job, JobId, StateHistoryEntry};

const EVENT_CAPACITY: usize = 64;

/// Change notification published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    /// A fresh page was loaded from the backend.
    Loaded { total: u64 },
    Replaced(JobId),
    Removed(JobId),
}

/// Owned copy of the collection's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub jobs: Vec<Job>,
    pub total: u64,
    pub in_flight: BTreeSet<JobId>,
    pub advisor_options: Vec<String>,
}

#[derive(Debug)]
pub struct JobCollection {
    jobs: Vec<Job>,
    total: u64,
    filters: Filters,
    pagination: Pagination,
    advisor_options: Vec<String>,
    /// Ids with exactly one outstanding operation. The only concurrency guard.
    in_flight: HashSet<JobId>,
    events: broadcast::Sender<CollectionEvent>,
}

impl Default for JobCollection {
    fn default() -> Self {
        Self::new(Pagination::default())
    }
}

impl JobCollection {
    pub fn new(pagination: Pagination) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            jobs: Vec::new(),
            total: 0,
            filters: Filters::default(),
            pagination,
            advisor_options: Vec::new(),
            in_flight: HashSet::new(),
            events,
        }
    }

    /// Starts from an already-fetched set of jobs.
    pub fn with_jobs(jobs: Vec<Job>, total: u64) -> Self {
        let mut collection = Self::default();
        collection.jobs = jobs;
        collection.total = total;
        collection.advisor_options = advisor_options(&collection.jobs);
        collection
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Distinct service advisors seen in the last loaded page, in order of appearance.
    pub fn advisor_options(&self) -> &[String] {
        &self.advisor_options
    }

    pub fn find_by_id(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    pub fn is_in_flight(&self, id: JobId) -> bool {
        self.in_flight.contains(&id)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> CollectionSnapshot {
        CollectionSnapshot {
            jobs: self.jobs.clone(),
            total: self.total,
            in_flight: self.in_flight.iter().copied().collect(),
            advisor_options: self.advisor_options.clone(),
        }
    }

    pub(crate) fn load(&mut self, page: JobPage) {
        // Advisor options only change when the page has something to offer.
        if !page.items.is_empty() {
            self.advisor_options = advisor_options(&page.items);
        }
        self.jobs = page.items;
        self.total = page.total;
        self.publish(CollectionEvent::Loaded { total: self.total });
    }

    /// Swaps in `job` for the entry with the same id. Returns false if there is none.
    pub(crate) fn replace(&mut self, job: Job) -> bool {
        let id = job.id;
        match self.jobs.iter_mut().find(|existing| existing.id == id) {
            Some(slot) => {
                *slot = job;
                self.publish(CollectionEvent::Replaced(id));
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove(&mut self, id: JobId) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.id == id)?;
        let removed = self.jobs.remove(index);
        self.publish(CollectionEvent::Removed(id));
        Some(removed)
    }

    pub(crate) fn decrement_total(&mut self) {
        self.total = self.total.saturating_sub(1);
    }

    pub(crate) fn set_history(&mut self, id: JobId, history: Vec<StateHistoryEntry>) -> bool {
        match self.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                job.history = Some(history);
                self.publish(CollectionEvent::Replaced(id));
                true
            }
            None => false,
        }
    }

    pub(crate) fn set_filters(&mut self, filters: Filters) {
        self.filters = filters;
    }

    pub(crate) fn set_pagination(&mut self, pagination: Pagination) {
        self.pagination = pagination;
    }

    /// Claims `id` for one operation. False if it is already claimed.
    pub(crate) fn mark_in_flight(&mut self, id: JobId) -> bool {
        self.in_flight.insert(id)
    }

    pub(crate) fn clear_in_flight(&mut self, id: JobId) {
        self.in_flight.remove(&id);
    }

    fn publish(&self, event: CollectionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn advisor_options(jobs: &[Job]) -> Vec<String> {
    let mut seen = Vec::new();
    for advisor in jobs.iter().filter_map(Job::service_advisor) {
        if !seen.iter().any(|known: &String| known == advisor) {
            seen.push(advisor.to_string());
        }
    }
    seen
}
