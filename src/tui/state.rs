//! TUI state and key handling.
//!
//! `UiState` is owned by the UI thread only. Key presses mutate the session directly and
//! return the commands the controller should run.

use crate::model::{SessionEvent, UiCommand};
use crate::notify::{Notice, NoticeBoard};
use crate::session::{collect_candidates, Card, SessionState, MAX_FILES};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const TAB_FILES: usize = 0;
pub const TAB_HELP: usize = 1;
pub const TAB_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing or pasting paths to add.
    AddPath(String),
    /// Editing the output filename of the merged PDF.
    EditName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Unknown,
    Healthy(Option<String>),
    Unreachable(String),
}

/// A card picked up with Space; `origin` is where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drag {
    pub origin: usize,
}

pub struct UiState {
    pub tab: usize,
    pub session: SessionState,
    pub notices: NoticeBoard,
    /// Selected row; `session.len()` is the trailing "add more" row.
    pub cursor: usize,
    pub drag: Option<Drag>,
    pub mode: InputMode,
    pub server: ServerStatus,
    pub base_url: String,
    /// Merge id of the download in flight.
    pub downloading: Option<String>,
}

impl UiState {
    pub fn new(base_url: impl Into<String>, notice_ttl: Duration) -> Self {
        Self {
            tab: TAB_FILES,
            session: SessionState::new(),
            notices: NoticeBoard::new(notice_ttl),
            cursor: 0,
            drag: None,
            mode: InputMode::Normal,
            server: ServerStatus::Unknown,
            base_url: base_url.into(),
            downloading: None,
        }
    }

    /// Whether the current merge result is being saved.
    pub fn is_downloading(&self) -> bool {
        match (&self.downloading, self.session.merge_result()) {
            (Some(id), Some(merge)) => *id == merge.merged_id,
            _ => false,
        }
    }

    fn add_row(&self) -> usize {
        self.session.len()
    }

    pub fn on_add_row(&self) -> bool {
        self.cursor >= self.add_row()
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.add_row());
    }

    /// Move session notices onto the board.
    pub fn flush_notices(&mut self) {
        for n in self.session.take_notices() {
            self.notices.push(n);
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.notices.prune(now);
    }

    /// Cards as currently displayed; a dragged card is shown at the cursor.
    pub fn display_cards(&self) -> Vec<Card<'_>> {
        let mut cards = self.session.cards();
        if let Some(drag) = self.drag {
            if drag.origin < cards.len() && self.cursor < cards.len() {
                let card = cards.remove(drag.origin);
                cards.insert(self.cursor, card);
                for (i, c) in cards.iter_mut().enumerate() {
                    c.badge = i + 1;
                }
            }
        }
        cards
    }

    /// Validate `paths` and queue an upload for whatever passes.
    pub fn add_paths(&mut self, paths: &[PathBuf]) -> Option<UiCommand> {
        if paths.is_empty() {
            return None;
        }
        let (candidates, problems) = collect_candidates(paths);
        for n in problems {
            self.notices.push(n);
        }
        let ticket = self.session.select(candidates);
        self.flush_notices();
        ticket.map(UiCommand::Preview)
    }

    pub fn apply_event(&mut self, ev: SessionEvent) {
        match ev {
            SessionEvent::PreviewFinished { token, result } => {
                self.session.apply_preview(token, result);
            }
            SessionEvent::MergeFinished { token, result } => {
                self.session.apply_merge(token, result);
            }
            SessionEvent::DownloadFinished { merged_id, result } => {
                if self.downloading.as_deref() == Some(merged_id.as_str()) {
                    self.downloading = None;
                }
                self.session.apply_download(&merged_id, result);
            }
            SessionEvent::Health(Ok(status)) => {
                tracing::info!(status = %status.status, "server health");
                self.server = ServerStatus::Healthy(status.timestamp);
            }
            SessionEvent::Health(Err(e)) => {
                self.notices
                    .push(Notice::warning(format!("Server not reachable: {e}")));
                self.server = ServerStatus::Unreachable(e.to_string());
            }
            SessionEvent::Notice(n) => self.notices.push(n),
        }
        self.clamp_cursor();
        self.flush_notices();
    }

    /// Handle one key press; returns commands for the controller.
    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<UiCommand> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![UiCommand::Quit];
        }
        let cmds = match self.mode {
            InputMode::AddPath(_) => self.key_add_path(key),
            InputMode::EditName => {
                self.key_edit_name(key);
                Vec::new()
            }
            InputMode::Normal => self.key_normal(key),
        };
        self.flush_notices();
        cmds
    }

    /// Bracketed paste: terminals deliver dropped files this way.
    pub fn handle_paste(&mut self, text: &str) -> Vec<UiCommand> {
        if let InputMode::AddPath(buf) = &mut self.mode {
            buf.push_str(text);
            return Vec::new();
        }
        if self.mode == InputMode::EditName {
            let raw = format!("{}{}", self.session.output_filename(), text);
            self.session.edit_filename(&raw);
            return Vec::new();
        }
        let cmds = self.add_paths(&parse_dropped_paths(text)).into_iter().collect();
        self.flush_notices();
        cmds
    }

    fn key_add_path(&mut self, key: KeyEvent) -> Vec<UiCommand> {
        let InputMode::AddPath(buf) = &mut self.mode else {
            return Vec::new();
        };
        match key.code {
            KeyCode::Esc => self.mode = InputMode::Normal,
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Char(c) => buf.push(c),
            KeyCode::Enter => {
                let paths = parse_dropped_paths(buf);
                self.mode = InputMode::Normal;
                return self.add_paths(&paths).into_iter().collect();
            }
            _ => {}
        }
        Vec::new()
    }

    fn key_edit_name(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => {
                self.session.commit_filename();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                let mut raw = self.session.output_filename().to_string();
                raw.pop();
                self.session.edit_filename(&raw);
            }
            KeyCode::Char(c) => {
                let raw = format!("{}{c}", self.session.output_filename());
                self.session.edit_filename(&raw);
            }
            _ => {}
        }
    }

    fn key_normal(&mut self, key: KeyEvent) -> Vec<UiCommand> {
        if self.drag.is_some() {
            return self.key_dragging(key);
        }
        let mut cmds = Vec::new();
        match key.code {
            KeyCode::Char('q') => cmds.push(UiCommand::Quit),
            KeyCode::Tab => self.tab = (self.tab + 1) % TAB_COUNT,
            KeyCode::Char('?') => self.tab = TAB_HELP,
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.add_row());
            }
            KeyCode::Char('K') => self.shift(-1),
            KeyCode::Char('J') => self.shift(1),
            KeyCode::Char(' ') if !self.on_add_row() => {
                self.drag = Some(Drag {
                    origin: self.cursor,
                });
            }
            KeyCode::Char('d') | KeyCode::Delete if !self.on_add_row() => {
                if let Some(id) = self.session.ordered_ids().get(self.cursor).cloned() {
                    self.session.remove(&id);
                    self.clamp_cursor();
                }
            }
            KeyCode::Char('a') => self.open_add_prompt(),
            KeyCode::Enter if self.on_add_row() => self.open_add_prompt(),
            KeyCode::Char('m') => {
                if let Ok(ticket) = self.session.begin_merge() {
                    cmds.push(UiCommand::Merge(ticket));
                }
            }
            KeyCode::Char('e') => {
                if self.session.merge_result().is_some() {
                    self.mode = InputMode::EditName;
                } else {
                    self.notices
                        .push(Notice::warning("Merge the files before renaming the result"));
                }
            }
            KeyCode::Char('s') => {
                if self.is_downloading() {
                    self.notices.push(Notice::info("Download already in progress"));
                } else if let Ok(ticket) = self.session.download_ticket() {
                    self.downloading = Some(ticket.merged_id.clone());
                    cmds.push(UiCommand::Download(ticket));
                }
            }
            KeyCode::Char('y') => self.copy_saved_path(),
            KeyCode::Char('c') => {
                self.session.clear_all();
                self.reset_view();
                cmds.push(UiCommand::CancelAll);
            }
            KeyCode::Char('n') => {
                self.session.start_new();
                self.notices.clear();
                self.reset_view();
                self.tab = TAB_FILES;
                cmds.push(UiCommand::CancelAll);
            }
            KeyCode::Char('r') => cmds.push(UiCommand::CheckHealth),
            _ => {}
        }
        cmds
    }

    fn key_dragging(&mut self, key: KeyEvent) -> Vec<UiCommand> {
        let Some(drag) = self.drag else {
            return Vec::new();
        };
        let last = self.session.len().saturating_sub(1);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.cursor = (self.cursor + 1).min(last),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.drag = None;
                self.session.move_file(drag.origin, self.cursor);
            }
            KeyCode::Esc => {
                self.drag = None;
                self.cursor = drag.origin;
            }
            KeyCode::Char('q') => return vec![UiCommand::Quit],
            _ => {}
        }
        Vec::new()
    }

    /// Shift+J/K: move the selected card one step.
    fn shift(&mut self, delta: isize) {
        if self.on_add_row() {
            return;
        }
        let Some(to) = self.cursor.checked_add_signed(delta) else {
            return;
        };
        if self.session.move_file(self.cursor, to) {
            self.cursor = to;
        }
    }

    fn open_add_prompt(&mut self) {
        if self.session.len() >= MAX_FILES {
            self.notices.push(Notice::warning(format!(
                "Maximum {MAX_FILES} files allowed"
            )));
            return;
        }
        self.mode = InputMode::AddPath(String::new());
    }

    fn copy_saved_path(&mut self) {
        let Some(path) = self.session.saved_path() else {
            self.notices
                .push(Notice::info("Nothing saved yet; press s to download first"));
            return;
        };
        let text = path.display().to_string();
        match super::export::copy_to_clipboard(&text) {
            Ok(()) => self.notices.push(Notice::success(format!("Copied {text}"))),
            Err(e) => self
                .notices
                .push(Notice::error(format!("Clipboard copy failed: {e:#}"))),
        }
    }

    fn reset_view(&mut self) {
        self.cursor = 0;
        self.drag = None;
        self.mode = InputMode::Normal;
        self.downloading = None;
    }
}

/// Split pasted or typed text into paths.
///
/// Accepts one path per line, whitespace-separated paths with backslash-escaped spaces,
/// quoted paths, and `file://` URLs. A backslash only escapes whitespace, a quote or
/// another backslash, and never on Windows where it separates path components.
pub fn parse_dropped_paths(text: &str) -> Vec<PathBuf> {
    let mut tokens = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => cur.push(c),
            (None, '\'' | '"') => quote = Some(c),
            (None, '\\') if !cfg!(windows) && chars.peek().is_some_and(|n| is_escapable(*n)) => {
                if let Some(next) = chars.next() {
                    cur.push(next);
                }
            }
            (None, c) if c.is_whitespace() => {
                if !cur.is_empty() {
                    tokens.push(std::mem::take(&mut cur));
                }
            }
            (None, c) => cur.push(c),
        }
    }
    if !cur.is_empty() {
        tokens.push(cur);
    }

    tokens
        .into_iter()
        .map(|t| {
            if t.starts_with("file://") {
                if let Some(path) = url::Url::parse(&t).ok().and_then(|u| u.to_file_path().ok()) {
                    return path;
                }
            }
            PathBuf::from(t)
        })
        .collect()
}

fn is_escapable(c: char) -> bool {
    c.is_whitespace() || matches!(c, '\\' | '\'' | '"')
}
