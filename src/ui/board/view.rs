use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::column::{ColumnBounds, Rect as HitRect};
use crate::render::{CardView, ColumnView};
use crate::task::{Priority, Task};

use super::app::{AppState, BoardLayout, CardHit, StatusKind};

const CARD_HEIGHT: u16 = 2;
const COLOR_TEXT: Color = Color::Rgb(234, 236, 239);
const COLOR_MUTED: Color = Color::Rgb(160, 165, 172);
const COLOR_BG_MUTED: Color = Color::Rgb(52, 56, 60);
const COLOR_INFO: Color = Color::Rgb(116, 198, 219);
const COLOR_WARNING: Color = Color::Rgb(244, 200, 98);
const COLOR_ERROR: Color = Color::Rgb(255, 107, 107);
const COLOR_SUCCESS: Color = Color::Rgb(126, 210, 146);
const COLOR_ACCENT: Color = Color::Rgb(122, 170, 255);
const COLOR_BORDER_LIST: Color = Color::Rgb(92, 126, 166);
const COLOR_BORDER_DETAIL: Color = Color::Rgb(180, 156, 92);

pub(crate) fn render(frame: &mut Frame, app: &mut AppState) {
    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(area);

    render_header(frame, app, chunks[0]);
    app.layout = render_columns(frame, app, chunks[1]);
    render_footer(frame, app, chunks[2]);

    let details = app.screen.borrow().details.clone();
    if let Some(task) = details {
        render_details(frame, area, &task);
    }
}

fn render_header(frame: &mut Frame, app: &AppState, area: Rect) {
    let screen = app.screen.borrow();
    let total: usize = screen.columns.iter().map(ColumnView::len).sum();
    let mut spans = vec![
        Span::styled(
            "Board",
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}", app.user), Style::default().fg(COLOR_TEXT)),
        Span::styled(
            format!("  {total} tasks"),
            Style::default().fg(COLOR_MUTED),
        ),
    ];
    if let Some(input) = &app.search_input {
        spans.push(Span::styled(
            format!("  search: {input}_"),
            Style::default().fg(COLOR_WARNING),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_columns(frame: &mut Frame, app: &AppState, area: Rect) -> BoardLayout {
    let screen = app.screen.borrow();
    let selected = app.selected_task();
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(area);

    let mut layout = BoardLayout::default();
    for (idx, view) in screen.columns.iter().enumerate() {
        let Some(&column_area) = chunks.get(idx) else {
            break;
        };
        layout
            .columns
            .push(ColumnBounds::new(view.column, hit_rect(column_area)));

        let highlighted = screen.highlighted[view.column.status().index()];
        let border = if highlighted {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_BORDER_LIST)
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(
                " {} ({}) ",
                view.column.status().label(),
                view.visible_cards().count()
            ));
        let inner = block.inner(column_area);
        frame.render_widget(block, column_area);

        if let Some(placeholder) = view.placeholder() {
            let widget = Paragraph::new(placeholder)
                .style(Style::default().fg(COLOR_MUTED))
                .alignment(Alignment::Center);
            frame.render_widget(widget, inner);
            continue;
        }

        let mut y = inner.y;
        for card in view.visible_cards() {
            if y + CARD_HEIGHT > inner.y + inner.height {
                break;
            }
            let card_area = Rect::new(inner.x, y, inner.width, CARD_HEIGHT);
            let is_selected = selected.as_ref() == Some(&card.id);
            let is_dragged = app.dragged.as_ref() == Some(&card.id);
            frame.render_widget(
                Paragraph::new(card_lines(card, inner.width as usize, is_selected, is_dragged)),
                card_area,
            );
            layout.cards.push(CardHit {
                task_id: card.id.clone(),
                rect: hit_rect(card_area),
            });
            y += CARD_HEIGHT + 1;
        }
    }
    layout
}

fn card_lines(card: &CardView, width: usize, selected: bool, dragged: bool) -> Vec<Line<'static>> {
    let mut title_style = Style::default()
        .fg(COLOR_TEXT)
        .add_modifier(Modifier::BOLD);
    if selected {
        title_style = title_style.bg(COLOR_BG_MUTED);
    }
    if dragged {
        title_style = title_style.add_modifier(Modifier::DIM);
    }

    let mut meta = vec![
        Span::styled(
            format!("{} ", card.priority.as_str()),
            Style::default().fg(priority_color(card.priority)),
        ),
        Span::styled(card.category.to_string(), Style::default().fg(COLOR_MUTED)),
    ];
    if let Some(progress) = card.progress {
        meta.push(Span::styled(
            format!(" {}/{}", progress.completed, progress.total),
            Style::default().fg(COLOR_SUCCESS),
        ));
    }
    if !card.assignees.is_empty() {
        let mut badges = format!(" @{}", card.assignees.join(","));
        if card.overflow > 0 {
            badges.push_str(&format!(" +{}", card.overflow));
        }
        meta.push(Span::styled(badges, Style::default().fg(COLOR_INFO)));
    }

    vec![
        Line::from(Span::styled(truncate_text(&card.title, width), title_style)),
        Line::from(meta),
    ]
}

fn render_footer(frame: &mut Frame, app: &AppState, area: Rect) {
    let hint_span = Span::styled(app.footer_hint(), Style::default().fg(COLOR_INFO));
    let line = if let Some((status, kind)) = app.status_line() {
        let status_style = match kind {
            StatusKind::Error => Style::default()
                .fg(COLOR_ERROR)
                .add_modifier(Modifier::BOLD),
            StatusKind::Info => Style::default().fg(COLOR_WARNING),
        };
        Line::from(vec![
            hint_span,
            Span::raw("  |  "),
            Span::styled(status, status_style),
        ])
    } else {
        Line::from(hint_span)
    };
    let widget = Paragraph::new(line).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(COLOR_BORDER_LIST)),
    );
    frame.render_widget(widget, area);
}

fn render_details(frame: &mut Frame, area: Rect, task: &Task) {
    let height = (task.subtasks.len() as u16 + 10).min(area.height.saturating_sub(2));
    let modal = centered_rect(area.width.saturating_mul(3) / 5, height, area);
    frame.render_widget(Clear, modal);

    let label = Style::default().fg(COLOR_MUTED);
    let mut lines = vec![
        Line::from(Span::styled(
            task.category.label(),
            Style::default().fg(COLOR_INFO),
        )),
        Line::from(Span::styled(
            task.title.clone(),
            Style::default()
                .fg(COLOR_TEXT)
                .add_modifier(Modifier::BOLD),
        )),
    ];
    if !task.description.is_empty() {
        lines.push(Line::from(task.description.clone()));
    }
    lines.push(Line::from(vec![
        Span::styled("Status: ", label),
        Span::raw(task.status.label()),
    ]));
    if !task.due_date.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Due date: ", label),
            Span::raw(task.due_date.clone()),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Priority: ", label),
        Span::styled(
            task.priority.as_str(),
            Style::default().fg(priority_color(task.priority)),
        ),
    ]));
    if !task.assigned_to.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Assigned to: ", label),
            Span::raw(task.assigned_to.join(", ")),
        ]));
    }
    for subtask in &task.subtasks {
        let mark = if subtask.completed { "[x] " } else { "[ ] " };
        lines.push(Line::from(format!("{mark}{}", subtask.text)));
    }

    let widget = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_DETAIL))
            .title(format!(" Task {} ", task.id)),
    );
    frame.render_widget(widget, modal);
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Urgent => COLOR_ERROR,
        Priority::Medium => COLOR_WARNING,
        Priority::Low => COLOR_SUCCESS,
    }
}

fn hit_rect(area: Rect) -> HitRect {
    HitRect::new(
        f64::from(area.x),
        f64::from(area.y),
        f64::from(area.width.saturating_sub(1)),
        f64::from(area.height.saturating_sub(1)),
    )
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn truncate_text(value: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max {
        return value.to_string();
    }
    if max <= 3 {
        return chars[..max].iter().collect();
    }
    let mut out: String = chars[..(max - 3)].iter().collect();
    out.push_str("...");
    out
}
