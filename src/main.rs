mod api;
mod assignments;
mod attendance;
mod config;
mod export;
mod logging;
mod models;
mod session;
mod ui;

use anyhow::{Context, Result};
use assignments::AssignmentLoader;
use attendance::AttendanceAggregator;
use config::Config;
use session::StaticTokenProvider;
use std::sync::Arc;
use ui::App;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    #[allow(unused_mut)]
    let mut config = Config::load().context("Failed to load configuration")?;

    #[cfg(feature = "cli")]
    {
        use clap::Parser;
        let args = config::Args::parse();
        config.apply_overrides(args.student, args.course, args.limit)?;
    }

    logging::init_logging(&config.log_file)?;
    tracing::info!(
        api_url = %config.api_url,
        assignment_limit = config.assignment_limit,
        "starting dashboard"
    );

    // Initialize API clients
    let http = api::build_http_client(&config)?;
    let tokens = Arc::new(StaticTokenProvider::new(config.access_token.clone()));

    let attendance_client =
        api::AttendanceClient::new(http.clone(), &config.api_url, &config.attendance_path);
    tracing::debug!(url = attendance_client.url(), "attendance endpoint");
    let attendance = AttendanceAggregator::new(Arc::new(attendance_client), tokens.clone());
    let assignments = AssignmentLoader::new(
        Arc::new(api::RestClient::new(
            http,
            &config.api_url,
            config.anon_key.clone(),
        )),
        tokens,
        config.assignment_limit,
    );

    // Start TUI application
    let mut app = App::new(attendance, assignments, config.course_id, config.student_id);
    app.run().await?;

    Ok(())
}
