//! Files tab: preview cards, merge result panel and status line.

use super::state::{InputMode, ServerStatus, UiState};
use crate::format::ensure_pdf_extension;
use crate::notify::NoticeLevel;
use crate::session::{merge_headline, MAX_FILES};
use crate::text_summary::card_line;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

pub fn draw_files(area: Rect, f: &mut Frame, state: &UiState) {
    let merged = state.session.merge_result().is_some();
    let prompt = matches!(state.mode, InputMode::AddPath(_));
    let notice_rows = state.notices.visible().count() as u16;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(3),
                Constraint::Length(if merged { 7 } else { 0 }),
                Constraint::Length(if prompt { 3 } else { 0 }),
                Constraint::Length(3 + notice_rows),
            ]
            .as_ref(),
        )
        .split(area);

    draw_cards(rows[0], f, state);
    if merged {
        draw_merge_panel(rows[1], f, state);
    }
    if let InputMode::AddPath(buf) = &state.mode {
        let p = Paragraph::new(format!("{buf}▏")).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Add paths (enter to add, esc to cancel)"),
        );
        f.render_widget(p, rows[2]);
    }
    draw_status(rows[3], f, state);
}

fn draw_cards(area: Rect, f: &mut Frame, state: &UiState) {
    let cards = state.display_cards();
    let mut items: Vec<ListItem> = cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            let dragged = state.drag.is_some() && i == state.cursor;
            let style = if dragged {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if dragged { "≡" } else { " " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, style),
                Span::styled(card_line(card), style),
            ]))
        })
        .collect();

    let add_label = if state.session.len() >= MAX_FILES {
        format!("   Maximum {MAX_FILES} files reached")
    } else if state.session.is_empty() {
        "   + Add PDFs (a, or drop files onto the terminal)".to_string()
    } else {
        "   + Add more".to_string()
    };
    items.push(ListItem::new(Line::from(Span::styled(
        add_label,
        Style::default().fg(Color::DarkGray),
    ))));

    let title = format!(
        "Files ({}/{MAX_FILES}) · {} pages",
        state.session.len(),
        state.session.total_pages()
    );
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">");
    let mut list_state = ListState::default().with_selected(Some(state.cursor));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_merge_panel(area: Rect, f: &mut Frame, state: &UiState) {
    let Some(merge) = state.session.merge_result() else {
        return;
    };
    let editing = state.mode == InputMode::EditName;
    let name = state.session.output_filename();
    let name_line = if editing {
        Line::from(vec![
            Span::raw("Save as: "),
            Span::styled(format!("{name}▏"), Style::default().fg(Color::Yellow)),
            Span::raw(".pdf"),
        ])
    } else {
        Line::from(vec![
            Span::raw("Save as: "),
            Span::styled(ensure_pdf_extension(name), Style::default().fg(Color::Cyan)),
            Span::styled("  (e to rename)", Style::default().fg(Color::DarkGray)),
        ])
    };
    let saved = match (state.is_downloading(), state.session.saved_path()) {
        (true, _) => Line::from(Span::styled("Saving…", Style::default().fg(Color::Yellow))),
        (false, Some(p)) => Line::from(vec![
            Span::raw("Saved: "),
            Span::styled(p.display().to_string(), Style::default().fg(Color::Green)),
            Span::styled("  (y to copy)", Style::default().fg(Color::DarkGray)),
        ]),
        (false, None) => Line::from(Span::styled(
            "Press s to save",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let p = Paragraph::new(vec![
        Line::from(Span::styled(
            merge_headline(merge.file_count),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(format!(
            "Total pages: {}   Merged file: {}   {}",
            merge.total_pages,
            merge.filename,
            merge.merged_at.as_deref().unwrap_or("")
        )),
        name_line,
        saved,
    ])
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).title("Merged"));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut Frame, state: &UiState) {
    let server = match &state.server {
        ServerStatus::Unknown => Span::styled("checking…", Style::default().fg(Color::DarkGray)),
        ServerStatus::Healthy(ts) => Span::styled(
            match ts {
                Some(ts) => format!("online (as of {ts})"),
                None => "online".to_string(),
            },
            Style::default().fg(Color::Green),
        ),
        ServerStatus::Unreachable(why) => {
            Span::styled(format!("unreachable: {why}"), Style::default().fg(Color::Red))
        }
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(
            state.session.phase().label(),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw("   server "),
        Span::raw(state.base_url.clone()),
        Span::raw(" "),
        server,
    ])];
    for n in state.notices.visible() {
        let color = match n.level {
            NoticeLevel::Info => Color::Gray,
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Warning => Color::Yellow,
            NoticeLevel::Error => Color::Red,
        };
        lines.push(Line::from(Span::styled(
            n.message.clone(),
            Style::default().fg(color),
        )));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}
