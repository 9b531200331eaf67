use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const NO_DESCRIPTION: &str = "Sin descripción";
pub const NO_COURSE: &str = "Sin curso";

/// Accept identifiers sent either as JSON strings or integers and keep them as text.
fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Parse a timestamp as the database may render it. Values without an offset are UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Postgres text output: "2024-01-01 00:00:00+00"
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// Attendance Endpoint Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
    Justified,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Late => "late",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Justified => "justified",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StudentRef {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl StudentRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub notes: Option<String>,
    /// `None` when the referenced student could not be resolved.
    #[serde(default)]
    pub student: Option<StudentRef>,
}

/// Server-side aggregate forwarded to the view as-is.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct AttendanceStats(pub serde_json::Value);

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceResponse {
    #[serde(default)]
    pub records: Option<Vec<AttendanceRecord>>,
    #[serde(default)]
    pub stats: Option<AttendanceStats>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceReport {
    pub records: Vec<AttendanceRecord>,
    pub stats: Option<AttendanceStats>,
}

impl From<AttendanceResponse> for AttendanceReport {
    fn from(response: AttendanceResponse) -> Self {
        Self {
            records: response.records.unwrap_or_default(),
            stats: response.stats,
        }
    }
}

// ============================================================================
// Assignment Query Models
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CourseRef {
    #[serde(default)]
    pub name: Option<String>,
}

/// One row of the `assignments` query, before derivation.
#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentRow {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient_timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub course: Option<CourseRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Pending,
    Overdue,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Overdue => "overdue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "Pendiente",
            AssignmentStatus::Overdue => "Vencida",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: DateTime<Utc>,
    pub course_name: String,
    pub status: AssignmentStatus,
}

// ============================================================================
// Internal Models for Presentation
// ============================================================================

/// Per-status counts over the records currently loaded in the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalTally {
    pub present: usize,
    pub late: usize,
    pub absent: usize,
    pub justified: usize,
}

impl LocalTally {
    pub fn calculate(records: &[AttendanceRecord]) -> Self {
        let mut tally = Self::default();
        for record in records {
            match record.status {
                AttendanceStatus::Present => tally.present += 1,
                AttendanceStatus::Late => tally.late += 1,
                AttendanceStatus::Absent => tally.absent += 1,
                AttendanceStatus::Justified => tally.justified += 1,
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.present + self.late + self.absent + self.justified
    }

    pub fn attendance_rate(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            ((self.present + self.late + self.justified) as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}
