use crate::models::{Assignment, AssignmentRow, AssignmentStatus, NO_COURSE, NO_DESCRIPTION};
use crate::session::{SessionError, TokenProvider};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use std::sync::Arc;

pub const DEFAULT_ASSIGNMENT_LIMIT: usize = 10;

// ============================================================================
// Query Shape
// ============================================================================

/// The `assignments` query the dashboard depends on, independent of the engine serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentQuery {
    pub student_id: String,
    pub limit: usize,
}

impl AssignmentQuery {
    pub const TABLE: &'static str = "assignments";
    pub const SELECT: &'static str = "id,title,description,due_date,course:course_id(name)";
    pub const ORDER: &'static str = "due_date.desc";

    pub fn new(student_id: impl Into<String>, limit: usize) -> Self {
        Self {
            student_id: student_id.into(),
            limit: limit.max(1),
        }
    }

    /// PostgREST query parameters for this query.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("select", Self::SELECT.to_string()),
            ("student_id", format!("eq.{}", self.student_id)),
            ("order", Self::ORDER.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssignmentQueryError {
    #[error("Selecciona un estudiante para ver sus tareas")]
    EmptyStudentId,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("No se pudo conectar con el servidor: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("La consulta de tareas falló (HTTP {status}): {message}")]
    Status { status: u16, message: String },
    #[error("La respuesta de tareas no es válida: {0}")]
    Malformed(#[from] serde_json::Error),
}

// ============================================================================
// Classification
// ============================================================================

/// `Overdue` only when the due date is strictly before `now`.
pub fn classify_due(due_date: DateTime<Utc>, now: DateTime<Utc>) -> AssignmentStatus {
    if due_date < now {
        AssignmentStatus::Overdue
    } else {
        AssignmentStatus::Pending
    }
}

/// Derive every row against the same evaluation time.
pub fn derive_assignments(rows: Vec<AssignmentRow>, now: DateTime<Utc>) -> Vec<Assignment> {
    rows.into_iter()
        .map(|row| {
            let course_name = row
                .course
                .and_then(|c| c.name)
                .unwrap_or_else(|| NO_COURSE.to_string());

            Assignment {
                status: classify_due(row.due_date, now),
                id: row.id,
                title: row.title,
                description: row
                    .description
                    .unwrap_or_else(|| NO_DESCRIPTION.to_string()),
                due_date: row.due_date,
                course_name,
            }
        })
        .collect()
}

pub fn format_due_date(due_date: &DateTime<Utc>) -> String {
    due_date
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M")
        .to_string()
}

// ============================================================================
// Loader
// ============================================================================

#[async_trait]
pub trait AssignmentSource: Send + Sync {
    async fn fetch_assignments(
        &self,
        query: &AssignmentQuery,
        token: &str,
    ) -> Result<Vec<AssignmentRow>, AssignmentQueryError>;
}

#[derive(Clone)]
pub struct AssignmentLoader {
    source: Arc<dyn AssignmentSource>,
    tokens: Arc<dyn TokenProvider>,
    limit: usize,
    clock: fn() -> DateTime<Utc>,
}

impl AssignmentLoader {
    pub fn new(
        source: Arc<dyn AssignmentSource>,
        tokens: Arc<dyn TokenProvider>,
        limit: usize,
    ) -> Self {
        Self {
            source,
            tokens,
            limit: limit.max(1),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Most recent assignments for a student, classified against a single `now`.
    pub async fn load_assignments(
        &self,
        student_id: &str,
    ) -> Result<Vec<Assignment>, AssignmentQueryError> {
        let student_id = student_id.trim();
        if student_id.is_empty() {
            return Err(AssignmentQueryError::EmptyStudentId);
        }

        let token = self.tokens.access_token().await?;
        let query = AssignmentQuery::new(student_id, self.limit);

        tracing::debug!(student_id, limit = query.limit, "querying assignments");
        let rows = match self.source.fetch_assignments(&query, &token).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(student_id, error = %e, "assignment query failed");
                return Err(e);
            }
        };

        let now = (self.clock)();
        let assignments = derive_assignments(rows, now);
        for assignment in &assignments {
            tracing::trace!(
                id = %assignment.id,
                due_date = %assignment.due_date,
                status = assignment.status.as_str(),
                "classified assignment"
            );
        }
        tracing::info!(
            student_id,
            count = assignments.len(),
            overdue = assignments
                .iter()
                .filter(|a| a.status == AssignmentStatus::Overdue)
                .count(),
            "assignments loaded"
        );

        Ok(assignments)
    }
}
