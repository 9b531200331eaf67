use crate::assignments::{AssignmentLoader, AssignmentQueryError};
use crate::attendance::{AttendanceAggregator, AttendanceFetchError};
use crate::export;
use crate::models::{Assignment, AttendanceReport};
use crate::ui::render::render_ui;
use crate::ui::state::{Action, ApplyOutcome, DashboardState, NoticeLevel, Ticket};
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Result of a background load, tagged with the ticket it was dispatched under.
#[derive(Debug)]
pub enum FetchOutcome {
    Attendance(Ticket, Result<AttendanceReport, AttendanceFetchError>),
    Assignments(Ticket, Result<Vec<Assignment>, AssignmentQueryError>),
}

pub struct App {
    attendance: AttendanceAggregator,
    assignments: AssignmentLoader,
    state: DashboardState,
    export_dir: PathBuf,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,
}

impl App {
    pub fn new(
        attendance: AttendanceAggregator,
        assignments: AssignmentLoader,
        course_id: Option<String>,
        student_id: Option<String>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            attendance,
            assignments,
            state: DashboardState::new(course_id, student_id),
            export_dir: PathBuf::from("."),
            outcome_tx,
            outcome_rx,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.reload_attendance();
        self.reload_assignments();

        // Main event loop
        let result = self.event_loop(&mut terminal).await;

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        loop {
            self.drain_outcomes();

            terminal.draw(|f| render_ui(f, &self.state))?;

            // Check for keyboard events with a short timeout
            if event::poll(std::time::Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key_event(key) {
                        break; // User quit
                    }
                }
            }

            // Small yield to allow the fetch tasks to run
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        tracing::info!("dashboard closed");
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match self.state.handle_key(key) {
            Action::Quit => return true,
            Action::ReloadAll => {
                self.reload_attendance();
                self.reload_assignments();
            }
            Action::ReloadAttendance => self.reload_attendance(),
            Action::ReloadAssignments => self.reload_assignments(),
            Action::ExportAttendance => self.export_attendance(),
            Action::None => {}
        }
        false
    }

    fn reload_attendance(&mut self) {
        let Some((ticket, course_id)) = self.state.attendance.begin() else {
            return;
        };

        let aggregator = self.attendance.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = aggregator.fetch_attendance(&course_id).await;
            // The receiver only goes away when the dashboard is closing
            let _ = tx.send(FetchOutcome::Attendance(ticket, result));
        });
    }

    fn reload_assignments(&mut self) {
        let Some((ticket, student_id)) = self.state.assignments.begin() else {
            return;
        };

        let loader = self.assignments.clone();
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = loader.load_assignments(&student_id).await;
            let _ = tx.send(FetchOutcome::Assignments(ticket, result));
        });
    }

    fn drain_outcomes(&mut self) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            self.apply_outcome(outcome);
        }
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Attendance(ticket, result) => {
                let kind = result.as_ref().err().map(|e| e.kind);
                match self.state.attendance.apply(ticket, result) {
                    ApplyOutcome::Stale => {
                        tracing::debug!(?ticket, "discarding stale attendance response")
                    }
                    ApplyOutcome::Loaded(_) => {}
                    ApplyOutcome::Failed(message) => {
                        tracing::warn!(?kind, error = %message, "attendance fetch failed");
                        self.state.notify(NoticeLevel::Error, message);
                    }
                }
            }
            FetchOutcome::Assignments(ticket, result) => {
                match self.state.assignments.apply(ticket, result) {
                    ApplyOutcome::Stale => {
                        tracing::debug!(?ticket, "discarding stale assignments response")
                    }
                    ApplyOutcome::Loaded(_) => {}
                    ApplyOutcome::Failed(message) => {
                        self.state.notify(NoticeLevel::Error, message);
                    }
                }
            }
        }
    }

    fn export_attendance(&mut self) {
        let Some(course_id) = self.state.attendance.loaded_key.clone() else {
            self.state.notify(NoticeLevel::Error, "No hay asistencia cargada para exportar");
            return;
        };
        match export::export_attendance_csv(
            &self.state.attendance.data.records,
            &course_id,
            &self.export_dir,
        ) {
            Ok(path) => {
                tracing::info!(path = %path.display(), "attendance exported");
                self.state.notify(
                    NoticeLevel::Info,
                    format!("Asistencia exportada a {}", path.display()),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "attendance export failed");
                self.state
                    .notify(NoticeLevel::Error, format!("No se pudo exportar: {}", e));
            }
        }
    }
}
