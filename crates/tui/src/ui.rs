use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use hunter_core::logger::{Level, LogRecord};
use hunter_core::worker;

use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(f.area())
    } else {
        Layout::default().constraints([Constraint::Percentage(100)]).split(f.area())
    };

    let frame = app.frame();
    let (label, bg) = banner(&frame);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(9)])
        .split(chunks[0]);

    let width = left[0].width as usize;
    let pad = width.saturating_sub(label.len());
    let centered = format!("{}{}{}", " ".repeat(pad / 2), label, " ".repeat(pad - pad / 2));
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            centered,
            Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD),
        ))),
        left[0],
    );

    f.render_widget(
        Paragraph::new(map_lines(app, bg)).block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        left[1],
    );

    f.render_widget(
        Paragraph::new(status_lines(&frame)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Status ")
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        left[2],
    );

    if app.log_visible && chunks.len() > 1 {
        let visible = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let scroll = app.log_scroll.min(total.saturating_sub(visible));
        let start = total.saturating_sub(visible + scroll);
        let end = total.saturating_sub(scroll);
        let lines: Vec<Line> = app.log_messages[start..end].iter().map(|m| log_line(m)).collect();

        f.render_widget(
            Paragraph::new(lines)
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(" Logs ")
                        .border_style(Style::default().fg(Color::Yellow)),
                )
                .wrap(Wrap { trim: false }),
            chunks[1],
        );
    }

    if let Some(dialog) = &app.confirm {
        dialog.render(f);
    }
}

fn banner(frame: &worker::Frame) -> (&'static str, Color) {
    let status = &frame.status;
    if status.running && status.paused {
        ("PAUSED (P to resume)", Color::Yellow)
    } else if status.running {
        ("RUNNING (S or F5 to stop)", Color::Green)
    } else if status.kind.is_some() {
        ("STOPPED (S or F5 to start)", Color::Red)
    } else {
        ("NO MAP (Enter to load)", Color::DarkGray)
    }
}

fn map_lines(app: &App, mark: Color) -> Vec<Line<'static>> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));
    let mut lines = vec![
        Line::from(vec![
            Span::raw(" "),
            key("j"),
            Span::raw("/"),
            key("k"),
            Span::raw(" select, "),
            key("enter"),
            Span::raw(" load, "),
            key("p"),
            Span::raw(" pause, "),
            key("l"),
            Span::raw(" logs"),
        ]),
        Line::from(""),
    ];
    if app.maps.is_empty() {
        lines.push(Line::from(Span::styled("  no maps in data/maps.json", Style::default().fg(Color::DarkGray))));
    }
    for (i, name) in app.maps.iter().enumerate() {
        let cursor = if i == app.selected { "> " } else { "  " };
        let loaded = app.loaded.as_deref() == Some(name.as_str());
        lines.push(Line::from(vec![
            Span::raw(cursor),
            Span::styled(if loaded { "[●] " } else { "[ ] " }, Style::default().fg(mark)),
            Span::styled(name.clone(), Style::default().fg(Color::White).add_modifier(Modifier::BOLD)),
        ]));
    }
    lines
}

fn status_lines(frame: &worker::Frame) -> Vec<Line<'static>> {
    let dim = Style::default().fg(Color::DarkGray);
    let field = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!(" {:<10}", name), dim), Span::raw(value)])
    };
    let status = &frame.status;
    let snap = &frame.snapshot;

    let position = match snap.position {
        Some(p) => format!("({}, {})", p.x, p.y),
        None => "not visible".to_string(),
    };
    let rune = match snap.rune() {
        Some(r) => format!("rune at ({}, {})", r.x, r.y),
        None => "no rune".to_string(),
    };
    let minimap = match frame.minimap {
        Some((w, h)) => format!("{}x{}", w, h),
        None => "-".to_string(),
    };
    let cycle = if status.running {
        format!("{:.0}s of {:.0}s left", status.remaining.max(0.0), status.cycle_duration)
    } else {
        "-".to_string()
    };

    vec![
        field("hunt", status.describe()),
        field("state", status.state.to_string()),
        field("cycle", cycle),
        field("position", position),
        field("objects", format!("{} detected, {}", snap.detections.len(), rune)),
        field("minimap", minimap),
        field("tick", frame.tick.to_string()),
    ]
}

/// Render one structured log line; unstructured text falls through as-is.
fn log_line(raw: &str) -> Line<'static> {
    let rec = LogRecord::decode(raw);
    let color = match rec.color {
        1 => Color::DarkGray,
        2 => Color::LightBlue,
        3 => Color::Green,
        4 => Color::Magenta,
        _ => Color::White,
    };

    let mut spans = Vec::new();
    if !rec.timestamp.is_empty() {
        spans.push(Span::styled(rec.timestamp, Style::default().fg(Color::DarkGray)));
        spans.push(Span::raw(" "));
    }
    match rec.level {
        Level::Error => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        Level::Warn => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        Level::Info => {}
    }
    if !rec.prefix.is_empty() {
        spans.push(Span::styled(rec.prefix, Style::default().fg(color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(rec.message, Style::default().fg(color)));
    Line::from(spans)
}
