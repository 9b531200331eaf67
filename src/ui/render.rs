use crate::assignments::format_due_date;
use crate::attendance::{
    classify_status, format_attendance_date, student_display_name, IconKind, Severity,
};
use crate::models::{AssignmentStatus, AttendanceStats, LocalTally};
use crate::ui::state::{DashboardState, EditTarget, Focus, Mode, NoticeLevel};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use std::time::Instant;

pub fn render_ui(frame: &mut Frame, state: &DashboardState) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(area);

    render_header(frame, chunks[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(8)])
        .split(body[0]);

    render_attendance(frame, left[0], state);
    render_stats(frame, left[1], state);
    render_assignments(frame, body[1], state);
    render_footer(frame, chunks[2], state);
}

pub fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Success => Color::Green,
        Severity::Caution => Color::Yellow,
        Severity::Failure => Color::Red,
        Severity::Informational => Color::Blue,
    }
}

pub fn icon_glyph(icon: IconKind) -> &'static str {
    match icon {
        IconKind::Check => "✓",
        IconKind::Clock => "◷",
        IconKind::Cross => "✗",
        IconKind::Info => "ℹ",
    }
}

fn panel_block(title: String, focused: bool) -> Block<'static> {
    let color = if focused { Color::Yellow } else { Color::Cyan };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn render_header(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let course = state.attendance.key.as_deref().unwrap_or("—");
    let student = state.assignments.key.as_deref().unwrap_or("—");

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Curso: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(course.to_string()),
        Span::raw("   "),
        Span::styled("Estudiante: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(student.to_string()),
    ]))
    .block(
        Block::default()
            .title("Panel de Padres")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

fn render_attendance(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let panel = &state.attendance;
    let title = if panel.loading {
        "Asistencia (cargando...)".to_string()
    } else {
        format!("Asistencia ({} registros)", panel.data.records.len())
    };
    let block = panel_block(title, state.focus == Focus::Attendance);

    if panel.key.is_none() {
        let hint = Paragraph::new("Presiona 'c' para elegir un curso")
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(hint, area);
        return;
    }

    let rows: Vec<Row> = panel
        .data
        .records
        .iter()
        .map(|record| {
            let badge = classify_status(record.status);
            Row::new(vec![
                Cell::from(format_attendance_date(&record.date)),
                Cell::from(student_display_name(record)),
                Cell::from(format!("{} {}", icon_glyph(badge.icon), badge.label))
                    .style(Style::default().fg(severity_color(badge.severity))),
                Cell::from(record.notes.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Percentage(35),
            Constraint::Length(14),
            Constraint::Min(10),
        ],
    )
    .header(
        Row::new(vec!["Fecha", "Estudiante", "Estado", "Notas"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut table_state = TableState::default().with_selected(Some(panel.selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn stats_lines(stats: Option<&AttendanceStats>) -> Vec<Line<'static>> {
    match stats.map(|s| &s.0) {
        None => vec![Line::from("Sin estadísticas")],
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let label = Style::default().add_modifier(Modifier::BOLD);
                Line::from(vec![
                    Span::styled(format!("{}: ", key), label),
                    Span::raw(value),
                ])
            })
            .collect(),
        Some(other) => vec![Line::from(other.to_string())],
    }
}

fn render_stats(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let tally = LocalTally::calculate(&state.attendance.data.records);

    let mut lines = stats_lines(state.attendance.data.stats.as_ref());
    if tally.total() > 0 {
        lines.push(Line::from(Span::styled(
            format!(
                "En pantalla: {} presentes, {} tarde, {} ausentes, {} justificados ({:.1}%)",
                tally.present,
                tally.late,
                tally.absent,
                tally.justified,
                tally.attendance_rate()
            ),
            Style::default().fg(Color::DarkGray),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title("Estadísticas")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_assignments(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let panel = &state.assignments;
    let title = if panel.loading {
        "Tareas (cargando...)".to_string()
    } else {
        let overdue = panel
            .data
            .iter()
            .filter(|a| a.status == AssignmentStatus::Overdue)
            .count();
        format!("Tareas ({} vencidas de {})", overdue, panel.data.len())
    };
    let block = panel_block(title, state.focus == Focus::Assignments);

    if panel.key.is_none() {
        let hint = Paragraph::new("Presiona 's' para elegir un estudiante")
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(hint, area);
        return;
    }

    let rows: Vec<Row> = panel
        .data
        .iter()
        .map(|assignment| {
            let color = match assignment.status {
                AssignmentStatus::Pending => Color::Green,
                AssignmentStatus::Overdue => Color::Red,
            };
            Row::new(vec![
                Cell::from(assignment.title.clone()),
                Cell::from(assignment.course_name.clone()),
                Cell::from(format_due_date(&assignment.due_date)),
                Cell::from(assignment.status.label()).style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(35),
            Constraint::Percentage(25),
            Constraint::Length(16),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Título", "Curso", "Entrega", "Estado"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(4)])
        .split(area);

    let mut table_state = TableState::default().with_selected(Some(panel.selected));
    frame.render_stateful_widget(table, chunks[0], &mut table_state);

    let description = panel
        .data
        .get(panel.selected)
        .map(|a| a.description.clone())
        .unwrap_or_default();
    let details = Paragraph::new(description)
        .block(Block::default().title("Descripción").borders(Borders::ALL))
        .wrap(Wrap { trim: true });

    frame.render_widget(details, chunks[1]);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let footer = match &state.mode {
        Mode::Editing { target, input } => {
            let label = match target {
                EditTarget::Course => "Curso",
                EditTarget::Student => "Estudiante",
            };
            Paragraph::new(format!("{}: {}_   [Enter: Confirmar | Esc: Cancelar]", label, input))
                .style(Style::default().fg(Color::Yellow))
        }
        Mode::Browsing => match state.visible_notice(Instant::now()) {
            Some(notice) => {
                let color = match notice.level {
                    NoticeLevel::Info => Color::Green,
                    NoticeLevel::Error => Color::Red,
                };
                Paragraph::new(notice.message.clone()).style(Style::default().fg(color))
            }
            None => Paragraph::new(
                "[Tab: Panel | ↑↓: Navegar | c: Curso | s: Estudiante | r: Recargar | e: Exportar | q: Salir]",
            ),
        },
    };

    frame.render_widget(
        footer
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center),
        area,
    );
}
