use crate::models::{AttendanceRecord, AttendanceReport, AttendanceStatus};
use crate::session::{SessionError, TokenProvider};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

// ============================================================================
// Status Taxonomy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Caution,
    Failure,
    Informational,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconKind {
    Check,
    Clock,
    Cross,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub severity: Severity,
    pub icon: IconKind,
}

/// Presentation triple for an attendance status.
pub fn classify_status(status: AttendanceStatus) -> StatusBadge {
    match status {
        AttendanceStatus::Present => StatusBadge {
            label: "Presente",
            severity: Severity::Success,
            icon: IconKind::Check,
        },
        AttendanceStatus::Late => StatusBadge {
            label: "Tarde",
            severity: Severity::Caution,
            icon: IconKind::Clock,
        },
        AttendanceStatus::Absent => StatusBadge {
            label: "Ausente",
            severity: Severity::Failure,
            icon: IconKind::Cross,
        },
        AttendanceStatus::Justified => StatusBadge {
            label: "Justificado",
            severity: Severity::Informational,
            icon: IconKind::Info,
        },
    }
}

pub fn format_attendance_date(date: &NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn student_display_name(record: &AttendanceRecord) -> String {
    record
        .student
        .as_ref()
        .map(|s| s.full_name())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Estudiante desconocido".to_string())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceErrorKind {
    InvalidInput,
    Auth,
    Transport,
    Status(u16),
    Malformed,
}

/// Any failure of the attendance pipeline, with a message fit for the user.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AttendanceFetchError {
    pub kind: AttendanceErrorKind,
    pub message: String,
}

impl AttendanceFetchError {
    pub fn new(kind: AttendanceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(err: SessionError) -> Self {
        Self::new(AttendanceErrorKind::Auth, err.to_string())
    }

    pub fn transport(err: reqwest::Error) -> Self {
        tracing::warn!(error = %err, "attendance request failed in transport");
        Self::new(
            AttendanceErrorKind::Transport,
            "No se pudo conectar con el servidor de asistencia",
        )
    }

    /// Non-success response; the server's `error` field wins when present.
    pub fn status(code: u16, server_message: Option<String>) -> Self {
        let message = server_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Error al cargar la asistencia (HTTP {})", code));
        Self::new(AttendanceErrorKind::Status(code), message)
    }

    pub fn malformed(err: serde_json::Error) -> Self {
        tracing::warn!(error = %err, "attendance payload could not be decoded");
        Self::new(
            AttendanceErrorKind::Malformed,
            "La respuesta de asistencia no es válida",
        )
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Remote endpoint returning a course's attendance records and stats.
#[async_trait]
pub trait AttendanceSource: Send + Sync {
    async fn fetch_attendance(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<AttendanceReport, AttendanceFetchError>;
}

#[derive(Clone)]
pub struct AttendanceAggregator {
    source: Arc<dyn AttendanceSource>,
    tokens: Arc<dyn TokenProvider>,
}

impl AttendanceAggregator {
    pub fn new(source: Arc<dyn AttendanceSource>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self { source, tokens }
    }

    pub async fn fetch_attendance(
        &self,
        course_id: &str,
    ) -> Result<AttendanceReport, AttendanceFetchError> {
        let course_id = course_id.trim();
        if course_id.is_empty() {
            return Err(AttendanceFetchError::new(
                AttendanceErrorKind::InvalidInput,
                "Selecciona un curso para ver la asistencia",
            ));
        }

        let token = self
            .tokens
            .access_token()
            .await
            .map_err(AttendanceFetchError::auth)?;

        tracing::debug!(course_id, "fetching attendance");
        let report = self.source.fetch_attendance(course_id, &token).await?;
        tracing::info!(
            course_id,
            records = report.records.len(),
            has_stats = report.stats.is_some(),
            "attendance loaded"
        );

        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::decode_attendance_response;
    use crate::models::AttendanceStats;
    use crate::session::StaticTokenProvider;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves a canned HTTP status and body, recording every call.
    pub(crate) struct FakeAttendanceSource {
        pub status: u16,
        pub body: String,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl FakeAttendanceSource {
        pub(crate) fn new(status: u16, body: serde_json::Value) -> Self {
            Self {
                status,
                body: body.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AttendanceSource for FakeAttendanceSource {
        async fn fetch_attendance(
            &self,
            course_id: &str,
            token: &str,
        ) -> Result<AttendanceReport, AttendanceFetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((course_id.to_string(), token.to_string()));
            decode_attendance_response(self.status, &self.body)
        }
    }

    fn aggregator(source: Arc<FakeAttendanceSource>) -> AttendanceAggregator {
        AttendanceAggregator::new(
            source,
            Arc::new(StaticTokenProvider::new("test-token".to_string())),
        )
    }

    #[test]
    fn test_taxonomy_is_total_with_known_severities() {
        let expected = [
            (AttendanceStatus::Present, Severity::Success),
            (AttendanceStatus::Late, Severity::Caution),
            (AttendanceStatus::Absent, Severity::Failure),
            (AttendanceStatus::Justified, Severity::Informational),
        ];

        for (status, severity) in expected {
            let badge = classify_status(status);
            assert!(!badge.label.is_empty());
            assert_eq!(badge.severity, severity);
        }

        let icons: Vec<IconKind> = expected
            .iter()
            .map(|(status, _)| classify_status(*status).icon)
            .collect();
        assert_eq!(
            icons,
            vec![IconKind::Check, IconKind::Clock, IconKind::Cross, IconKind::Info]
        );
    }

    #[tokio::test]
    async fn test_course_records_and_stats_pass_through() {
        let source = Arc::new(FakeAttendanceSource::new(
            200,
            json!({
                "records": [
                    { "id": "r1", "date": "2024-03-01", "status": "present" },
                    { "id": "r2", "date": "2024-03-02", "status": "absent" }
                ],
                "stats": { "present": 1, "absent": 1 }
            }),
        ));

        let report = aggregator(source.clone()).fetch_attendance("C1").await.unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].id, "r1");
        assert_eq!(report.records[0].status, AttendanceStatus::Present);
        assert_eq!(
            report.records[1].date,
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
        assert_eq!(report.records[1].status, AttendanceStatus::Absent);
        assert_eq!(
            report.stats,
            Some(AttendanceStats(json!({ "present": 1, "absent": 1 })))
        );

        let calls = source.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[("C1".to_string(), "test-token".to_string())]);
    }

    #[tokio::test]
    async fn test_unknown_course_yields_empty_records() {
        let source = Arc::new(FakeAttendanceSource::new(200, json!({ "records": [] })));
        let report = aggregator(source).fetch_attendance("missing").await.unwrap();
        assert!(report.records.is_empty());
        assert!(report.stats.is_none());
    }

    #[tokio::test]
    async fn test_server_error_message_is_surfaced() {
        let source = Arc::new(FakeAttendanceSource::new(500, json!({ "error": "db down" })));
        let err = aggregator(source).fetch_attendance("C1").await.unwrap_err();
        assert_eq!(err.message, "db down");
        assert_eq!(err.to_string(), "db down");
        assert_eq!(err.kind, AttendanceErrorKind::Status(500));
    }

    #[tokio::test]
    async fn test_blank_course_is_rejected_without_request() {
        let source = Arc::new(FakeAttendanceSource::new(200, json!({ "records": [] })));
        let err = aggregator(source.clone()).fetch_attendance("   ").await.unwrap_err();
        assert_eq!(err.kind, AttendanceErrorKind::InvalidInput);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_is_an_auth_failure() {
        let source = Arc::new(FakeAttendanceSource::new(200, json!({ "records": [] })));
        let tokens = Arc::new(StaticTokenProvider::new(String::new()));
        let aggregator = AttendanceAggregator::new(source.clone(), tokens);
        let err = aggregator.fetch_attendance("C1").await.unwrap_err();
        assert_eq!(err.kind, AttendanceErrorKind::Auth);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_display_helpers() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_attendance_date(&date), "01/03/2024");

        let record: AttendanceRecord = serde_json::from_value(json!({
            "id": "r1", "date": "2024-03-01", "status": "present", "student": null
        }))
        .unwrap();
        assert_eq!(student_display_name(&record), "Estudiante desconocido");
    }
}
