use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::state::JobState;

/// Open-ended business attributes of a job (advisor, descriptions, ETA fields...).
pub type Fields = Map<String, Value>;

/// Attribute keys the workflow reads or writes. Everything else passes through untouched.
pub mod fields {
    pub const ID: &str = "id";
    pub const CURRENT_STATE: &str = "estado_actual";
    pub const HISTORY: &str = "historial";
    /// Target state inside a transition request body.
    pub const TARGET_STATE: &str = "nuevo_estado";
    pub const DETENTION_REASON: &str = "motivo_detencion";
    pub const DETENTION_DETAIL: &str = "detalle_motivo";
    /// ETA recorded on the history entry of a detention.
    pub const HISTORY_ETA: &str = "fecha_eta";
    /// ETA kept on the job itself, drives overdue alerts.
    pub const ETA: &str = "eta_fecha";
    pub const ETA_REASON: &str = "eta_motivo";
    pub const TECHNICIAN_ID: &str = "tecnico_id";
    pub const DESCRIPTION: &str = "detalle_pedido";
    pub const SERVICE_ADVISOR: &str = "asesor_servicio";

    /// Keys a caller may not set through transition context; they are owned by
    /// the coordinator or by the typed fields of [`Job`](super::Job).
    pub const RESERVED: [&str; 4] = [ID, CURRENT_STATE, HISTORY, TARGET_STATE];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        JobId(id)
    }
}

/// One stay of a job in a given state. History is append-only, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateHistoryEntry {
    #[serde(rename = "estado")]
    pub state: JobState,
    #[serde(rename = "fecha_inicio")]
    pub entered_at: DateTime<Utc>,
    #[serde(rename = "fecha_fin", default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Server-formatted elapsed time, when the server provides one.
    #[serde(rename = "duracion", default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(rename = "motivo_detencion", default, skip_serializing_if = "Option::is_none")]
    pub detention_reason: Option<String>,
    #[serde(rename = "detalle_motivo", default, skip_serializing_if = "Option::is_none")]
    pub detention_detail: Option<String>,
    #[serde(rename = "fecha_eta", default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
}

impl StateHistoryEntry {
    pub fn new(state: JobState, entered_at: DateTime<Utc>) -> Self {
        Self {
            state,
            entered_at,
            ended_at: None,
            duration: None,
            detention_reason: None,
            detention_detail: None,
            eta: None,
        }
    }

    /// Time spent in this state; an open entry is measured up to `now`.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.ended_at.unwrap_or(now) - self.entered_at
    }
}

/// A tracked unit of repair work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "estado_actual")]
    pub current_state: JobState,
    #[serde(rename = "historial", default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<StateHistoryEntry>>,
    #[serde(flatten)]
    pub attributes: Fields,
}

impl Job {
    pub fn new(id: impl Into<JobId>, current_state: JobState) -> Self {
        Self {
            id: id.into(),
            current_state,
            history: None,
            attributes: Fields::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn service_advisor(&self) -> Option<&str> {
        self.attribute(fields::SERVICE_ADVISOR)
            .and_then(Value::as_str)
            .filter(|advisor| !advisor.is_empty())
    }

    /// Applies the three-way merge to this job's record and reads the result back.
    ///
    /// The identity of the job is kept even if the server echoes something else.
    pub fn merged(&self, server: &Fields, context: &Fields) -> Result<Job, serde_json::Error> {
        let old = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Fields::new(),
        };
        let mut job: Job = serde_json::from_value(Value::Object(merge_fields(&old, server, context)))?;
        job.id = self.id;
        Ok(job)
    }
}

/// `{ ...old, ...server, ...context }`: client intent beats the server echo,
/// which beats stale local data.
pub fn merge_fields(old: &Fields, server: &Fields, context: &Fields) -> Fields {
    let mut merged = old.clone();
    for layer in [server, context] {
        for (key, value) in layer {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn object(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_precedence_is_context_then_server_then_old() {
        let old = object(json!({"a": 1, "b": 2}));
        let server = object(json!({"b": 3, "c": 4}));
        let context = object(json!({"c": 5, "d": 6}));

        let merged = merge_fields(&old, &server, &context);
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 3, "c": 5, "d": 6}));
    }

    #[test]
    fn job_merge_keeps_client_eta_when_server_omits_it() {
        let job = Job::new(7, JobState::InProgress)
            .with_attribute("patente", "ABCD12")
            .with_attribute(fields::ETA, "2026-01-01T11:00:00");
        let server = object(json!({"id": 7, "estado_actual": "trabajo detenido", "patente": "ABCD-12"}));
        let context = object(json!({"eta_fecha": "2026-01-02T11:00:00"}));

        let merged = job.merged(&server, &context).unwrap();
        assert_eq!(merged.current_state, JobState::Stopped);
        assert_eq!(merged.attribute("patente"), Some(&json!("ABCD-12")));
        assert_eq!(merged.attribute(fields::ETA), Some(&json!("2026-01-02T11:00:00")));
    }

    #[test]
    fn job_merge_cannot_change_identity() {
        let job = Job::new(1, JobState::Scheduled);
        let server = object(json!({"id": 99}));
        let merged = job.merged(&server, &Fields::new()).unwrap();
        assert_eq!(merged.id, JobId(1));
    }

    #[test]
    fn job_deserializes_backend_record() {
        let job: Job = serde_json::from_value(json!({
            "id": 12,
            "estado_actual": "en lavado",
            "asesor_servicio": "Carla",
            "historial": [
                {"estado": "agendado", "fecha_inicio": "2026-03-02T09:00:00Z", "fecha_fin": "2026-03-02T12:30:00Z"},
                {"estado": "en lavado", "fecha_inicio": "2026-03-02T12:30:00Z"}
            ]
        }))
        .unwrap();

        assert_eq!(job.id, JobId(12));
        assert_eq!(job.current_state, JobState::InWash);
        assert_eq!(job.service_advisor(), Some("Carla"));
        let history = job.history.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].elapsed(Utc::now()), Duration::minutes(210));
    }

    #[test]
    fn open_history_entry_measures_until_now() {
        let entered = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let entry = StateHistoryEntry::new(JobState::Stopped, entered);
        let now = Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap();
        assert_eq!(entry.elapsed(now), Duration::days(1));
    }
}
