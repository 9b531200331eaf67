use crate::models::{Assignment, AttendanceReport};
use crossterm::event::{KeyCode, KeyEvent};
use std::fmt::Display;
use std::time::{Duration, Instant};

pub const NOTICE_TTL: Duration = Duration::from_secs(5);
const MAX_INPUT_LEN: usize = 64;

/// Sequence number handed out when a request is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct Generation {
    latest: u64,
}

impl Generation {
    pub fn dispatch(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }
}

pub trait Rows {
    fn row_count(&self) -> usize;
}

impl Rows for AttendanceReport {
    fn row_count(&self) -> usize {
        self.records.len()
    }
}

impl Rows for Vec<Assignment> {
    fn row_count(&self) -> usize {
        self.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Stale,
    Loaded(usize),
    Failed(String),
}

/// One dashboard panel: the identifier it is scoped by and the last applied result.
#[derive(Debug)]
pub struct Panel<T> {
    pub key: Option<String>,
    pub data: T,
    /// Identifier `data` was loaded for; lags `key` while a reload is in flight.
    pub loaded_key: Option<String>,
    pending_key: Option<String>,
    pub loading: bool,
    pub selected: usize,
    generation: Generation,
}

impl<T: Default + Rows> Panel<T> {
    pub fn new(key: Option<String>) -> Self {
        Self {
            key: key.filter(|k| !k.trim().is_empty()),
            data: T::default(),
            loaded_key: None,
            pending_key: None,
            loading: false,
            selected: 0,
            generation: Generation::default(),
        }
    }

    /// Start a new load, superseding anything in flight.
    /// Returns `None` when there is no identifier to load for.
    pub fn begin(&mut self) -> Option<(Ticket, String)> {
        let ticket = self.generation.dispatch();
        match &self.key {
            Some(key) => {
                self.loading = true;
                self.pending_key = Some(key.clone());
                Some((ticket, key.clone()))
            }
            None => {
                self.data = T::default();
                self.loaded_key = None;
                self.pending_key = None;
                self.loading = false;
                self.selected = 0;
                None
            }
        }
    }

    /// Publish a result if it belongs to the latest dispatch. Failures clear the panel.
    pub fn apply<E: Display>(&mut self, ticket: Ticket, result: Result<T, E>) -> ApplyOutcome {
        if !self.generation.is_current(ticket) {
            return ApplyOutcome::Stale;
        }

        self.loading = false;
        self.selected = 0;
        match result {
            Ok(data) => {
                self.data = data;
                self.loaded_key = self.pending_key.take();
                ApplyOutcome::Loaded(self.data.row_count())
            }
            Err(e) => {
                self.data = T::default();
                self.loaded_key = None;
                self.pending_key = None;
                ApplyOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn set_key(&mut self, key: &str) {
        let key = key.trim();
        self.key = if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        };
    }

    pub fn select_next(&mut self) {
        if self.selected < self.data.row_count().saturating_sub(1) {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Attendance,
    Assignments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    Course,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Browsing,
    Editing { target: EditTarget, input: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    ReloadAll,
    ReloadAttendance,
    ReloadAssignments,
    ExportAttendance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    pub level: NoticeLevel,
    raised_at: Instant,
}

#[derive(Debug)]
pub struct DashboardState {
    pub attendance: Panel<AttendanceReport>,
    pub assignments: Panel<Vec<Assignment>>,
    pub focus: Focus,
    pub mode: Mode,
    notice: Option<Notice>,
}

impl DashboardState {
    pub fn new(course_id: Option<String>, student_id: Option<String>) -> Self {
        Self {
            attendance: Panel::new(course_id),
            assignments: Panel::new(student_id),
            focus: Focus::Attendance,
            mode: Mode::Browsing,
            notice: None,
        }
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
            level,
            raised_at: Instant::now(),
        });
    }

    pub fn visible_notice(&self, now: Instant) -> Option<&Notice> {
        self.notice
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.raised_at) < NOTICE_TTL)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        let mode = std::mem::replace(&mut self.mode, Mode::Browsing);

        match mode {
            Mode::Browsing => self.handle_browsing_key(key.code),
            Mode::Editing { target, mut input } => match key.code {
                KeyCode::Esc => Action::None,
                KeyCode::Enter => match target {
                    EditTarget::Course => {
                        self.attendance.set_key(&input);
                        Action::ReloadAttendance
                    }
                    EditTarget::Student => {
                        self.assignments.set_key(&input);
                        Action::ReloadAssignments
                    }
                },
                KeyCode::Backspace => {
                    input.pop();
                    self.mode = Mode::Editing { target, input };
                    Action::None
                }
                KeyCode::Char(c) => {
                    if input.chars().count() < MAX_INPUT_LEN {
                        input.push(c);
                    }
                    self.mode = Mode::Editing { target, input };
                    Action::None
                }
                _ => {
                    self.mode = Mode::Editing { target, input };
                    Action::None
                }
            },
        }
    }

    fn handle_browsing_key(&mut self, code: KeyCode) -> Action {
        match code {
            KeyCode::Char('q') => Action::Quit,
            KeyCode::Char('r') => Action::ReloadAll,
            KeyCode::Char('e') => Action::ExportAttendance,
            KeyCode::Char('c') => {
                self.mode = Mode::Editing {
                    target: EditTarget::Course,
                    input: self.attendance.key.clone().unwrap_or_default(),
                };
                Action::None
            }
            KeyCode::Char('s') => {
                self.mode = Mode::Editing {
                    target: EditTarget::Student,
                    input: self.assignments.key.clone().unwrap_or_default(),
                };
                Action::None
            }
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Attendance => Focus::Assignments,
                    Focus::Assignments => Focus::Attendance,
                };
                Action::None
            }
            KeyCode::Down => {
                match self.focus {
                    Focus::Attendance => self.attendance.select_next(),
                    Focus::Assignments => self.assignments.select_next(),
                }
                Action::None
            }
            KeyCode::Up => {
                match self.focus {
                    Focus::Attendance => self.attendance.select_previous(),
                    Focus::Assignments => self.assignments.select_previous(),
                }
                Action::None
            }
            _ => Action::None,
        }
    }
}
