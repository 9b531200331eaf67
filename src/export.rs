use crate::attendance::{classify_status, student_display_name};
use crate::models::AttendanceRecord;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Export the loaded attendance records of a course to a CSV file in `dir`.
pub fn export_attendance_csv(
    records: &[AttendanceRecord],
    course_id: &str,
    dir: &Path,
) -> Result<PathBuf> {
    if records.is_empty() {
        anyhow::bail!("No attendance records to export");
    }

    // Generate filename with timestamp
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let safe_course: String = course_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let filepath = dir.join(format!("attendance_{}_{}.csv", safe_course, timestamp));

    let mut wtr = csv::Writer::from_path(&filepath).context("Failed to create CSV file")?;

    wtr.write_record([
        "id",
        "date",
        "student_id",
        "student",
        "email",
        "status",
        "label",
        "notes",
    ])
    .context("Failed to write CSV headers")?;

    for record in records {
        let (student_id, email) = record
            .student
            .as_ref()
            .map(|s| (s.id.clone(), s.email.clone().unwrap_or_default()))
            .unwrap_or_default();

        wtr.write_record([
            record.id.clone(),
            record.date.format("%Y-%m-%d").to_string(),
            student_id,
            student_display_name(record),
            email,
            record.status.as_str().to_string(),
            classify_status(record.status).label.to_string(),
            record.notes.clone().unwrap_or_default(),
        ])
        .context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV writer")?;

    Ok(filepath)
}
