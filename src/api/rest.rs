use crate::assignments::{AssignmentQuery, AssignmentQueryError, AssignmentSource};
use crate::models::AssignmentRow;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;

/// PostgREST-style table interface of the school platform.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    anon_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl RestClient {
    pub fn new(client: reqwest::Client, api_url: &str, anon_key: Option<String>) -> Self {
        Self {
            client,
            base_url: format!("{}/rest/v1", api_url.trim_end_matches('/')),
            anon_key,
        }
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.anon_key {
            if let Ok(value) = HeaderValue::from_str(key) {
                headers.insert("apikey", value);
            }
        }
        headers
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }
}

#[async_trait]
impl AssignmentSource for RestClient {
    async fn fetch_assignments(
        &self,
        query: &AssignmentQuery,
        token: &str,
    ) -> Result<Vec<AssignmentRow>, AssignmentQueryError> {
        let url = self.table_url(AssignmentQuery::TABLE);
        let response = self
            .client
            .get(&url)
            .headers(self.build_headers())
            .bearer_auth(token)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        decode_assignment_rows(status.as_u16(), &body)
    }
}

pub fn decode_assignment_rows(
    status: u16,
    body: &str,
) -> Result<Vec<AssignmentRow>, AssignmentQueryError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<RestErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(AssignmentQueryError::Status { status, message });
    }

    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_table_url() {
        let client = RestClient::new(reqwest::Client::new(), "https://db.example.com/", None);
        assert_eq!(
            client.table_url(AssignmentQuery::TABLE),
            "https://db.example.com/rest/v1/assignments"
        );
    }

    #[test]
    fn test_anon_key_header() {
        let client = RestClient::new(
            reqwest::Client::new(),
            "https://db.example.com",
            Some("anon-key".to_string()),
        );
        let headers = client.build_headers();
        assert_eq!(headers.get("apikey").unwrap(), "anon-key");

        let client = RestClient::new(reqwest::Client::new(), "https://db.example.com", None);
        assert!(client.build_headers().get("apikey").is_none());
    }

    #[test]
    fn test_decode_rows_with_joined_course() {
        let body = r#"[
            {"id": 7, "title": "Ensayo", "description": null,
             "due_date": "2024-01-01T00:00:00+00:00", "course": {"name": "Lengua"}},
            {"id": "8", "title": "Problemas", "description": "Ejercicios 1-10",
             "due_date": "2024-02-01T12:30:00Z", "course": null}
        ]"#;

        let rows = decode_assignment_rows(200, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "7");
        assert!(rows[0].description.is_none());
        assert_eq!(
            rows[0].course.as_ref().and_then(|c| c.name.as_deref()),
            Some("Lengua")
        );
        assert!(rows[1].course.is_none());
    }

    #[test]
    fn test_decode_rows_without_offset_or_title() {
        let body = r#"[
            {"id": 1, "title": null, "description": "Sin fecha de zona",
             "due_date": "2024-01-01T00:00:00", "course": null},
            {"id": 2, "title": "Mapa", "description": null,
             "due_date": "2024-03-10 08:00:00+00", "course": {"name": "Geografía"}}
        ]"#;

        let rows = decode_assignment_rows(200, body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "");
        assert_eq!(
            rows[0].due_date,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            rows[1].due_date,
            Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_unreadable_due_date() {
        let body = r#"[{"id": 1, "title": "X", "due_date": "pronto"}]"#;
        let err = decode_assignment_rows(200, body).unwrap_err();
        assert!(matches!(err, AssignmentQueryError::Malformed(_)));
    }

    #[test]
    fn test_decode_error_uses_message_field() {
        let body = r#"{"code":"42P01","message":"relation \"assignments\" does not exist"}"#;
        match decode_assignment_rows(404, body) {
            Err(AssignmentQueryError::Status { status, message }) => {
                assert_eq!(status, 404);
                assert!(message.contains("does not exist"));
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_decode_malformed_rows() {
        let err = decode_assignment_rows(200, r#"{"not":"a list"}"#).unwrap_err();
        assert!(matches!(err, AssignmentQueryError::Malformed(_)));
    }
}
