//! Text and JSON summaries for one-shot output.

use crate::format::{elide_filename, format_size, MAX_DISPLAY_NAME};
use crate::model::MergeResult;
use crate::notify::Notice;
use crate::session::{merge_headline, Card, Phase, SessionState};
use crate::thumbnail::Thumbnail;
use serde::Serialize;
use std::path::PathBuf;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// One card rendered as a single line: `  2. report.pdf  12 pages  1.5 MB  [PDF]`.
pub(crate) fn card_line(card: &Card<'_>) -> String {
    let p = card.preview;
    let thumb = Thumbnail::from_data_uri(p.thumbnail.as_deref());
    format!(
        "{:>3}. {:<width$}  {:>4} {}  {:>9}  {}",
        card.badge,
        elide_filename(&p.filename, MAX_DISPLAY_NAME),
        p.pages,
        if p.pages == 1 { "page " } else { "pages" },
        format_size(p.size),
        thumb.label(),
        width = MAX_DISPLAY_NAME,
    )
}

pub(crate) fn build_preview_summary(session: &SessionState) -> TextSummary {
    let mut lines = Vec::new();
    if let Some(id) = session.session_id() {
        lines.push(format!("Session: {id}"));
    }
    lines.extend(session.cards().iter().map(card_line));
    TextSummary { lines }
}

/// Success panel: headline, page count, original server filename and saved path.
pub(crate) fn build_merge_summary(session: &SessionState) -> TextSummary {
    let mut lines = Vec::new();
    let Some(merge) = session.merge_result() else {
        return TextSummary { lines };
    };
    lines.push(merge_headline(merge.file_count));
    lines.push(format!("Total pages: {}", merge.total_pages));
    lines.push(format!("Merged file: {}", merge.filename));
    if let Some(at) = &merge.merged_at {
        lines.push(format!("Merged at: {at}"));
    }
    if let Some(msg) = merge.message.as_deref().filter(|m| !m.trim().is_empty()) {
        lines.push(format!("Server: {msg}"));
    }
    lines.push(format!("Output name: {}", session.output_filename()));
    if let Some(path) = session.saved_path() {
        lines.push(format!("Saved: {}", path.display()));
    }
    TextSummary { lines }
}

#[derive(Debug, Serialize)]
pub(crate) struct FileReport {
    pub position: usize,
    pub id: String,
    pub filename: String,
    pub pages: u32,
    pub size: u64,
}

/// Machine-readable result of a one-shot run.
#[derive(Debug, Serialize)]
pub(crate) struct JsonReport {
    pub phase: Phase,
    pub session_id: Option<String>,
    pub files: Vec<FileReport>,
    pub merge: Option<MergeResult>,
    pub output_filename: Option<String>,
    pub saved_path: Option<PathBuf>,
    pub notices: Vec<Notice>,
}

pub(crate) fn build_json_report(session: &SessionState, notices: Vec<Notice>) -> JsonReport {
    JsonReport {
        phase: session.phase(),
        session_id: session.session_id().map(str::to_string),
        files: session
            .cards()
            .into_iter()
            .map(|c| FileReport {
                position: c.badge,
                id: c.preview.id.clone(),
                filename: c.preview.filename.clone(),
                pages: c.preview.pages,
                size: c.preview.size,
            })
            .collect(),
        merge: session.merge_result().cloned(),
        output_filename: session
            .merge_result()
            .map(|_| session.output_filename().to_string()),
        saved_path: session.saved_path().map(|p| p.to_path_buf()),
        notices,
    }
}
