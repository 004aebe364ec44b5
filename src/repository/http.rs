use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::error::RepositoryError;
use super::{Filters, JobPage, JobRepository, Pagination};
use crate::workflow::{Fields, JobId, StateHistoryEntry};

/// [`JobRepository`] backed by the shop's REST API.
pub struct HttpJobRepository {
    client: Client,
    base_url: String,
}

impl HttpJobRepository {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, RepositoryError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Server {
                status: status.as_u16(),
                detail: server_detail(&body),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pulls the human-readable `detail` out of an error body, if there is one.
fn server_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn list_params(filters: &Filters, pagination: &Pagination) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("page", pagination.page.to_string()),
        ("limit", pagination.rows_per_page.to_string()),
        ("sort_by", pagination.sort_by.clone()),
        (
            "sort_order",
            if pagination.descending { "desc" } else { "asc" }.to_string(),
        ),
    ];
    if let Some(search) = filters.search.as_deref().filter(|s| !s.is_empty()) {
        params.push(("search", search.to_string()));
    }
    if let Some(state) = filters.state {
        params.push(("estado_actual", state.as_str().to_string()));
    }
    if let Some(advisor) = filters.service_advisor.as_deref().filter(|s| !s.is_empty()) {
        params.push(("asesor_servicio", advisor.to_string()));
    }
    if let Some((from, to)) = filters.date_range {
        params.push(("fecha_desde", from.to_string()));
        params.push(("fecha_hasta", to.to_string()));
    }
    params
}

impl JobRepository for HttpJobRepository {
    async fn list(
        &self,
        filters: &Filters,
        pagination: &Pagination,
    ) -> Result<JobPage, RepositoryError> {
        debug!(page = pagination.page, "listing jobs");
        let response = self
            .client
            .get(self.url("trabajos/"))
            .query(&list_params(filters, pagination))
            .send()
            .await?;
        Self::read(response).await
    }

    async fn update_state(&self, id: JobId, body: &Fields) -> Result<Fields, RepositoryError> {
        debug!(%id, "updating job state");
        let response = self
            .client
            .patch(self.url(&format!("trabajos/{id}/estado")))
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn update_details(&self, id: JobId, fields: &Fields) -> Result<Fields, RepositoryError> {
        debug!(%id, "updating job details");
        let response = self
            .client
            .patch(self.url(&format!("trabajos/{id}")))
            .json(fields)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn history(&self, id: JobId) -> Result<Vec<StateHistoryEntry>, RepositoryError> {
        let response = self
            .client
            .get(self.url(&format!("trabajos/{id}/historial")))
            .send()
            .await?;
        Self::read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::JobState;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn list_sends_filters_and_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trabajos/"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "15"))
            .and(query_param("sort_order", "desc"))
            .and(query_param("estado_actual", "en lavado"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": 3, "estado_actual": "en lavado", "patente": "KLTR44"}],
                "total": 16
            })))
            .mount(&server)
            .await;

        let repo = HttpJobRepository::new(server.uri());
        let filters = Filters {
            state: Some(JobState::InWash),
            ..Default::default()
        };
        let pagination = Pagination {
            page: 2,
            ..Default::default()
        };
        let page = repo.list(&filters, &pagination).await.unwrap();

        assert_eq!(page.total, 16);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].current_state, JobState::InWash);
    }

    #[tokio::test]
    async fn update_state_patches_state_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/trabajos/5/estado"))
            .and(body_json(json!({"nuevo_estado": "en lavado"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": 5, "estado_actual": "en lavado"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let repo = HttpJobRepository::new(format!("{}/", server.uri()));
        let mut body = Fields::new();
        body.insert("nuevo_estado".into(), json!("en lavado"));
        let echoed = repo.update_state(JobId(5), &body).await.unwrap();

        assert_eq!(echoed.get("estado_actual"), Some(&json!("en lavado")));
    }

    #[tokio::test]
    async fn server_error_carries_detail() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/trabajos/5/estado"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "detail": "Transición no permitida de 'agendado' a 'en lavado'"
            })))
            .mount(&server)
            .await;

        let repo = HttpJobRepository::new(server.uri());
        let err = repo.update_state(JobId(5), &Fields::new()).await.unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(
            err.detail(),
            Some("Transición no permitida de 'agendado' a 'en lavado'")
        );
    }

    #[tokio::test]
    async fn history_decodes_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trabajos/9/historial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "estado": "agendado", "fecha_inicio": "2026-10-12T08:00:00Z", "fecha_fin": "2026-10-12T09:00:00Z"},
                {"id": 2, "estado": "trabajo detenido", "fecha_inicio": "2026-10-12T09:00:00Z",
                 "motivo_detencion": "repuestos a pedido", "fecha_eta": "2026-10-14T11:00:00Z"}
            ])))
            .mount(&server)
            .await;

        let repo = HttpJobRepository::new(server.uri());
        let history = repo.history(JobId(9)).await.unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state, JobState::Stopped);
        assert_eq!(history[1].detention_reason.as_deref(), Some("repuestos a pedido"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trabajos/9/historial"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let repo = HttpJobRepository::new(server.uri());
        let err = repo.history(JobId(9)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Decode(_)));
    }

    #[test]
    fn detail_extraction_handles_structured_bodies() {
        assert_eq!(server_detail(r#"{"detail": "no"}"#).as_deref(), Some("no"));
        assert_eq!(
            server_detail(r#"{"detail": [{"msg": "field required"}]}"#).as_deref(),
            Some(r#"[{"msg":"field required"}]"#)
        );
        assert!(server_detail("not json").is_none());
        assert!(server_detail(r#"{"other": 1}"#).is_none());
    }
}
