use crate::assignments::DEFAULT_ASSIGNMENT_LIMIT;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_ATTENDANCE_PATH: &str = "/functions/v1/attendance";
const DEFAULT_LOG_FILE: &str = "parent-dashboard.log";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub anon_key: Option<String>,
    pub access_token: String,
    pub attendance_path: String,
    pub student_id: Option<String>,
    pub course_id: Option<String>,
    pub assignment_limit: usize,
    pub log_file: PathBuf,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

/// Optional YAML layer, named by `DASHBOARD_CONFIG`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_url: Option<String>,
    anon_key: Option<String>,
    attendance_path: Option<String>,
    student_id: Option<String>,
    course_id: Option<String>,
    assignment_limit: Option<usize>,
    log_file: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
}

impl FileConfig {
    fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        let file = match env::var("DASHBOARD_CONFIG") {
            Ok(path) if !path.is_empty() => FileConfig::from_path(Path::new(&path))?,
            _ => FileConfig::default(),
        };

        Self::from_sources(file, |key| env::var(key).ok())
    }

    fn from_sources(file: FileConfig, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = non_empty("DASHBOARD_API_URL")
            .or(file.api_url)
            .context("DASHBOARD_API_URL not found. Please set it in .env, the config file or environment")?;

        let access_token = non_empty("DASHBOARD_ACCESS_TOKEN")
            .context("DASHBOARD_ACCESS_TOKEN not found. Please set it in .env file or environment")?;

        let assignment_limit = match non_empty("DASHBOARD_ASSIGNMENT_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("DASHBOARD_ASSIGNMENT_LIMIT is not a number: {}", raw))?,
            None => file.assignment_limit.unwrap_or(DEFAULT_ASSIGNMENT_LIMIT),
        };

        if assignment_limit == 0 {
            anyhow::bail!("Assignment limit must be at least 1");
        }

        Ok(Config {
            api_url,
            anon_key: non_empty("DASHBOARD_ANON_KEY").or(file.anon_key),
            access_token,
            attendance_path: file
                .attendance_path
                .unwrap_or_else(|| DEFAULT_ATTENDANCE_PATH.to_string()),
            student_id: non_empty("DASHBOARD_STUDENT_ID").or(file.student_id),
            course_id: non_empty("DASHBOARD_COURSE_ID").or(file.course_id),
            assignment_limit,
            log_file: file
                .log_file
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            request_timeout: Duration::from_secs(file.request_timeout_secs.unwrap_or(30)),
            connect_timeout: Duration::from_secs(file.connect_timeout_secs.unwrap_or(10)),
        })
    }

    /// Command-line flags take precedence over every other source.
    #[cfg_attr(not(feature = "cli"), allow(dead_code))]
    pub fn apply_overrides(
        &mut self,
        student_id: Option<String>,
        course_id: Option<String>,
        assignment_limit: Option<usize>,
    ) -> Result<()> {
        if let Some(student_id) = student_id {
            self.student_id = Some(student_id);
        }
        if let Some(course_id) = course_id {
            self.course_id = Some(course_id);
        }
        if let Some(limit) = assignment_limit {
            if limit == 0 {
                anyhow::bail!("Assignment limit must be at least 1");
            }
            self.assignment_limit = limit;
        }
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, clap::Parser)]
#[command(name = "parent-dashboard", about = "Attendance and assignments for your student")]
pub struct Args {
    /// Student whose assignments are shown
    #[arg(long)]
    pub student: Option<String>,

    /// Course whose attendance is shown
    #[arg(long)]
    pub course: Option<String>,

    /// Maximum number of assignments to load
    #[arg(long)]
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_from_environment_only() {
        let config = Config::from_sources(
            FileConfig::default(),
            lookup(&[
                ("DASHBOARD_API_URL", "https://school.example.com"),
                ("DASHBOARD_ACCESS_TOKEN", "token"),
            ]),
        )
        .unwrap();

        assert_eq!(config.assignment_limit, 10);
        assert_eq!(config.attendance_path, DEFAULT_ATTENDANCE_PATH);
        assert_eq!(config.log_file, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.student_id.is_none());
        assert!(config.anon_key.is_none());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = FileConfig::from_yaml(
            r#"
api_url: "https://file.example.com"
anon_key: "file-anon"
student_id: "S-file"
course_id: "C-file"
assignment_limit: 5
connect_timeout_secs: 3
"#,
        )
        .unwrap();

        let config = Config::from_sources(
            file,
            lookup(&[
                ("DASHBOARD_ACCESS_TOKEN", "token"),
                ("DASHBOARD_STUDENT_ID", "S-env"),
                ("DASHBOARD_COURSE_ID", ""),
            ]),
        )
        .unwrap();

        assert_eq!(config.api_url, "https://file.example.com");
        assert_eq!(config.anon_key.as_deref(), Some("file-anon"));
        assert_eq!(config.student_id.as_deref(), Some("S-env"));
        assert_eq!(config.course_id.as_deref(), Some("C-file"));
        assert_eq!(config.assignment_limit, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let result = Config::from_sources(
            FileConfig::default(),
            lookup(&[("DASHBOARD_API_URL", "https://school.example.com")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_limit_is_rejected() {
        let result = Config::from_sources(
            FileConfig::default(),
            lookup(&[
                ("DASHBOARD_API_URL", "https://school.example.com"),
                ("DASHBOARD_ACCESS_TOKEN", "token"),
                ("DASHBOARD_ASSIGNMENT_LIMIT", "0"),
            ]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::from_sources(
            FileConfig::default(),
            lookup(&[
                ("DASHBOARD_API_URL", "https://school.example.com"),
                ("DASHBOARD_ACCESS_TOKEN", "token"),
            ]),
        )
        .unwrap();

        config
            .apply_overrides(Some("S2".to_string()), None, Some(3))
            .unwrap();
        assert_eq!(config.student_id.as_deref(), Some("S2"));
        assert_eq!(config.assignment_limit, 3);
        assert!(config.apply_overrides(None, None, Some(0)).is_err());
    }
}
