//! Remote persistence for job records.
//!
//! [`JobRepository`] is the contract the coordinator needs from the backend;
//! [`HttpJobRepository`] implements it over the shop's REST API.

pub mod error;
pub mod http;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::workflow::{Fields, Job, JobId, JobState, StateHistoryEntry};

pub use error::RepositoryError;
pub use http::HttpJobRepository;

/// Listing filters. `None` means "do not filter on this".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub search: Option<String>,
    pub state: Option<JobState>,
    pub service_advisor: Option<String>,
    /// Inclusive creation-date range.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub sort_by: String,
    pub descending: bool,
    /// 1-based.
    pub page: u32,
    pub rows_per_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            sort_by: "fecha_creacion_pedido".to_string(),
            descending: true,
            page: 1,
            rows_per_page: 15,
        }
    }
}

/// One page of active jobs plus the total across all pages.
#[derive(Debug, Clone, Deserialize)]
pub struct JobPage {
    pub items: Vec<Job>,
    pub total: u64,
}

/// Backend operations the workflow depends on.
///
/// Update calls return the job-shaped (possibly partial) record the server echoes back.
#[allow(async_fn_in_trait)]
pub trait JobRepository {
    async fn list(
        &self,
        filters: &Filters,
        pagination: &Pagination,
    ) -> Result<JobPage, RepositoryError>;

    async fn update_state(&self, id: JobId, body: &Fields) -> Result<Fields, RepositoryError>;

    async fn update_details(&self, id: JobId, fields: &Fields) -> Result<Fields, RepositoryError>;

    async fn history(&self, id: JobId) -> Result<Vec<StateHistoryEntry>, RepositoryError>;
}

impl<R: JobRepository + ?Sized> JobRepository for &R {
    async fn list(
        &self,
        filters: &Filters,
        pagination: &Pagination,
    ) -> Result<JobPage, RepositoryError> {
        (**self).list(filters, pagination).await
    }

    async fn update_state(&self, id: JobId, body: &Fields) -> Result<Fields, RepositoryError> {
        (**self).update_state(id, body).await
    }

    async fn update_details(&self, id: JobId, fields: &Fields) -> Result<Fields, RepositoryError> {
        (**self).update_details(id, fields).await
    }

    async fn history(&self, id: JobId) -> Result<Vec<StateHistoryEntry>, RepositoryError> {
        (**self).history(id).await
    }
}
