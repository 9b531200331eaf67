use crate::attendance::{AttendanceFetchError, AttendanceSource};
use crate::models::{AttendanceReport, AttendanceResponse, ErrorBody};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT};

/// Attendance endpoint that returns records plus server-computed stats.
#[derive(Clone)]
pub struct AttendanceClient {
    client: reqwest::Client,
    url: String,
}

impl AttendanceClient {
    pub fn new(client: reqwest::Client, api_url: &str, attendance_path: &str) -> Self {
        let url = format!(
            "{}/{}",
            api_url.trim_end_matches('/'),
            attendance_path.trim_start_matches('/')
        );
        Self { client, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AttendanceSource for AttendanceClient {
    async fn fetch_attendance(
        &self,
        course_id: &str,
        token: &str,
    ) -> Result<AttendanceReport, AttendanceFetchError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("course_id", course_id)])
            .bearer_auth(token)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(AttendanceFetchError::transport)?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(AttendanceFetchError::transport)?;

        decode_attendance_response(status.as_u16(), &body)
    }
}

/// Turn a raw status code and body into a report or a classified failure.
pub fn decode_attendance_response(
    status: u16,
    body: &str,
) -> Result<AttendanceReport, AttendanceFetchError> {
    if !(200..300).contains(&status) {
        let server_message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error);
        tracing::warn!(
            status,
            body = %body.chars().take(500).collect::<String>(),
            "attendance endpoint returned an error"
        );
        return Err(AttendanceFetchError::status(status, server_message));
    }

    let response: AttendanceResponse =
        serde_json::from_str(body).map_err(AttendanceFetchError::malformed)?;

    Ok(response.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceErrorKind;

    #[test]
    fn test_url_joins_base_and_path() {
        let client = AttendanceClient::new(
            reqwest::Client::new(),
            "https://school.example.com/",
            "/functions/v1/attendance",
        );
        assert_eq!(client.url(), "https://school.example.com/functions/v1/attendance");
    }

    #[test]
    fn test_error_body_message() {
        let err = decode_attendance_response(500, r#"{"error":"db down"}"#).unwrap_err();
        assert_eq!(err.message, "db down");
        assert_eq!(err.kind, AttendanceErrorKind::Status(500));
    }

    #[test]
    fn test_error_without_body_gets_generic_message() {
        let err = decode_attendance_response(502, "<html>Bad Gateway</html>").unwrap_err();
        assert_eq!(err.kind, AttendanceErrorKind::Status(502));
        assert!(err.message.contains("502"));

        let err = decode_attendance_response(401, r#"{"error":""}"#).unwrap_err();
        assert!(err.message.contains("401"));
    }

    #[test]
    fn test_missing_records_and_stats() {
        let report = decode_attendance_response(200, "{}").unwrap();
        assert!(report.records.is_empty());
        assert!(report.stats.is_none());
    }

    #[test]
    fn test_unknown_status_fails_the_whole_payload() {
        let body = r#"{"records":[{"id":"r1","date":"2024-03-01","status":"sick"}],"stats":null}"#;
        let err = decode_attendance_response(200, body).unwrap_err();
        assert_eq!(err.kind, AttendanceErrorKind::Malformed);
    }

    #[test]
    fn test_stats_are_kept_verbatim() {
        let body = r#"{"records":[],"stats":{"present":3,"rate":0.75,"by_month":{"03":3}}}"#;
        let report = decode_attendance_response(200, body).unwrap();
        let stats = report.stats.unwrap();
        assert_eq!(
            stats.0,
            serde_json::json!({"present": 3, "rate": 0.75, "by_month": {"03": 3}})
        );
    }
}
