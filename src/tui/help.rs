use crate::session::{MAX_FILES, MAX_FILE_SIZE};
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn bind(keys: &str, pad: usize, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(keys.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:pad$}{what}", "")),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        bind("q / Ctrl-C", 2, "Quit"),
        bind("tab", 9, "Switch tabs"),
        bind("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Files:"),
        bind("↑/↓ or j/k", 2, "Navigate"),
        bind("a / enter", 3, "Add PDFs (type or paste paths; dropping files pastes them)"),
        bind("space", 7, "Pick up / drop the selected card"),
        bind("esc", 9, "Cancel a drag"),
        bind("J / K", 7, "Move the selected card down / up"),
        bind("d / del", 5, "Remove the selected card"),
        bind("m", 11, "Merge in the shown order"),
        bind("c", 11, "Clear all files"),
        bind("n", 11, "Start a new merge"),
        bind("r", 11, "Check server health"),
        Line::from(""),
        Line::from("After merging:"),
        bind("e", 11, "Edit the output filename (enter/esc to finish)"),
        bind("s", 11, "Save the merged PDF to the download folder"),
        bind("y", 11, "Copy the saved path to clipboard"),
        Line::from(""),
        Line::from(format!(
            "Limits: {MAX_FILES} files per merge, {} per file, PDF only.",
            crate::format::format_size(MAX_FILE_SIZE)
        )),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
