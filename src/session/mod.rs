//! Session state for one upload → preview → reorder → merge → download workflow.
//!
//! Everything here is synchronous and owned by a single thread. Network work is described
//! by tickets ([`PreviewTicket`], [`MergeTicket`], [`DownloadTicket`]) that the caller
//! executes; completions come back through the `apply_*` methods together with the
//! [`RequestToken`] they were issued with, so late results of superseded requests are
//! ignored. User-facing notices accumulate in an outbox drained with
//! [`SessionState::take_notices`].

mod selection;

pub use selection::{
    collect_candidates, validate_batch, LocalFile, MAX_FILES, MAX_FILE_SIZE, PDF_MIME,
};

use crate::error::{ApiError, SessionError};
use crate::format::{ensure_pdf_extension, plural, sanitize_filename, strip_extension};
use crate::model::{
    FileOrderEntry, FilePreview, MergeRequest, MergeResponse, MergeResult, PreviewResponse,
};
use crate::notify::Notice;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Generation number of an issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Empty,
    Selecting,
    PreviewReady,
    Merging,
    MergeComplete,
    Downloaded,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Empty => "No files",
            Phase::Selecting => "Uploading…",
            Phase::PreviewReady => "Ready to merge",
            Phase::Merging => "Merging…",
            Phase::MergeComplete => "Merged",
            Phase::Downloaded => "Downloaded",
        }
    }
}

/// What happened to a completion handed to an `apply_*` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Adopted,
    Failed,
    /// The token was superseded or invalidated; the result was dropped.
    Stale,
}

#[derive(Debug)]
pub struct PreviewTicket {
    pub token: RequestToken,
    pub session_id: Option<String>,
    pub files: Vec<LocalFile>,
}

#[derive(Debug)]
pub struct MergeTicket {
    pub token: RequestToken,
    pub request: MergeRequest,
}

#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub merged_id: String,
    /// Name sent to the server as the `filename` query parameter.
    pub filename: String,
    /// Local file name (always ends in `.pdf`).
    pub save_as: String,
}

/// A preview card: record plus its 1-based position.
#[derive(Debug, Clone, Copy)]
pub struct Card<'a> {
    pub badge: usize,
    pub preview: &'a FilePreview,
}

pub fn merge_headline(file_count: u32) -> String {
    if file_count == 1 {
        "1 PDF has been merged successfully".to_string()
    } else {
        format!("{file_count} PDFs have been merged successfully")
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    session_id: Option<String>,
    records: Vec<FilePreview>,
    // Authoritative merge order (preview ids).
    order: Vec<String>,
    merge: Option<MergeResult>,
    default_filename: String,
    output_filename: String,
    saved_path: Option<PathBuf>,
    next_token: u64,
    pending_preview: Option<RequestToken>,
    pending_merge: Option<RequestToken>,
    last_error: Option<ApiError>,
    outbox: Vec<Notice>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.pending_merge.is_some() {
            Phase::Merging
        } else if self.pending_preview.is_some() {
            Phase::Selecting
        } else if self.merge.is_some() && self.saved_path.is_some() {
            Phase::Downloaded
        } else if self.merge.is_some() {
            Phase::MergeComplete
        } else if self.order.is_empty() {
            Phase::Empty
        } else {
            Phase::PreviewReady
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn merge_result(&self) -> Option<&MergeResult> {
        self.merge.as_ref()
    }

    pub fn default_filename(&self) -> &str {
        &self.default_filename
    }

    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }

    pub fn saved_path(&self) -> Option<&Path> {
        self.saved_path.as_deref()
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    pub fn preview_pending(&self) -> bool {
        self.pending_preview.is_some()
    }

    pub fn merge_pending(&self) -> bool {
        self.pending_merge.is_some()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.outbox)
    }

    /// Cards in merge order; badges are always `1..=N`.
    pub fn cards(&self) -> Vec<Card<'_>> {
        self.order
            .iter()
            .filter_map(|id| self.record(id))
            .enumerate()
            .map(|(i, preview)| Card {
                badge: i + 1,
                preview,
            })
            .collect()
    }

    pub fn ordered_ids(&self) -> &[String] {
        &self.order
    }

    pub fn total_pages(&self) -> u32 {
        self.cards().iter().map(|c| c.preview.pages).sum()
    }

    fn record(&self, id: &str) -> Option<&FilePreview> {
        self.records.iter().find(|r| r.id == id)
    }

    fn issue_token(&mut self) -> RequestToken {
        self.next_token += 1;
        RequestToken(self.next_token)
    }

    fn notify(&mut self, notice: Notice) {
        self.outbox.push(notice);
    }

    fn fail(&mut self, err: ApiError) {
        tracing::warn!(error = %err, "request failed");
        self.notify(Notice::error(err.to_string()));
        self.last_error = Some(err);
    }

    /// The order changed: a pending or completed merge no longer matches it.
    fn invalidate_merge(&mut self) {
        if self.pending_merge.take().is_some() {
            self.notify(Notice::warning(
                "Merge discarded because the file list changed",
            ));
        }
        if self.merge.take().is_some() {
            self.saved_path = None;
            self.notify(Notice::info(
                "File list changed; merge again to update the result",
            ));
        }
    }

    /// Validate a batch and, when anything was accepted, issue a preview request for it.
    pub fn select(&mut self, candidates: Vec<LocalFile>) -> Option<PreviewTicket> {
        if self.pending_preview.is_some() {
            self.notify(Notice::warning(
                "An upload is already in progress; wait for it to finish",
            ));
            return None;
        }

        let checked = validate_batch(candidates, self.order.len());
        self.outbox.extend(checked.notices);
        if checked.accepted.is_empty() {
            return None;
        }

        let token = self.issue_token();
        self.pending_preview = Some(token);
        tracing::info!(
            files = checked.accepted.len(),
            session = self.session_id.as_deref().unwrap_or("-"),
            "preview requested"
        );
        Some(PreviewTicket {
            token,
            session_id: self.session_id.clone(),
            files: checked.accepted,
        })
    }

    pub fn apply_preview(
        &mut self,
        token: RequestToken,
        result: Result<PreviewResponse, ApiError>,
    ) -> Applied {
        if self.pending_preview != Some(token) {
            tracing::debug!(?token, "dropping stale preview result");
            return Applied::Stale;
        }
        self.pending_preview = None;

        let (session_id, previews) = match self.check_preview(result) {
            Ok(v) => v,
            Err(e) => {
                self.fail(e);
                return Applied::Failed;
            }
        };

        if self.session_id.is_none() {
            tracing::info!(session = %session_id, "session started");
            self.session_id = Some(session_id);
        }
        let mut added = 0;
        for preview in previews {
            if self.record(&preview.id).is_some() {
                continue;
            }
            self.order.push(preview.id.clone());
            self.records.push(preview);
            added += 1;
        }
        self.invalidate_merge();
        self.notify(Notice::success(format!(
            "Added {}",
            plural(added, "file", "files")
        )));
        Applied::Adopted
    }

    fn check_preview(
        &self,
        result: Result<PreviewResponse, ApiError>,
    ) -> Result<(String, Vec<FilePreview>), ApiError> {
        let resp = result?;
        if !resp.success {
            return Err(ApiError::Rejected(
                resp.error.unwrap_or_else(|| "Upload failed".to_string()),
            ));
        }
        let session_id = resp
            .session_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::Malformed("preview response has no session_id".into()))?;
        if resp.previews.is_empty() {
            return Err(ApiError::Malformed("preview response has no files".into()));
        }
        if let Some(current) = &self.session_id {
            if *current != session_id {
                return Err(ApiError::SessionMismatch {
                    expected: current.clone(),
                    got: session_id,
                });
            }
        }
        Ok((session_id, resp.previews))
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let Some(pos) = self.order.iter().position(|o| o == id) else {
            return false;
        };
        self.order.remove(pos);
        let name = self
            .record(id)
            .map(|r| r.filename.clone())
            .unwrap_or_else(|| id.to_string());
        self.records.retain(|r| r.id != id);
        self.invalidate_merge();
        self.notify(Notice::info(format!("Removed {name}")));
        true
    }

    /// Move the card at `from` to position `to` (both 0-based).
    pub fn move_file(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.order.len() || to >= self.order.len() {
            return false;
        }
        let id = self.order.remove(from);
        self.order.insert(to, id);
        self.invalidate_merge();
        true
    }

    /// Replace the order with a permutation of the current ids.
    pub fn reorder(&mut self, ids: &[String]) -> Result<(), SessionError> {
        if ids.len() != self.order.len() {
            return Err(SessionError::InvalidOrder(format!(
                "expected {} entries, got {}",
                self.order.len(),
                ids.len()
            )));
        }
        let known: HashSet<&String> = self.order.iter().collect();
        let mut seen = HashSet::new();
        for id in ids {
            if !known.contains(id) {
                return Err(SessionError::InvalidOrder(format!("unknown file {id}")));
            }
            if !seen.insert(id) {
                return Err(SessionError::InvalidOrder(format!("{id} listed twice")));
            }
        }
        if self.order.as_slice() != ids {
            self.order = ids.to_vec();
            self.invalidate_merge();
        }
        Ok(())
    }

    /// Reorder by 1-based current positions, e.g. `[2, 1, 3]` swaps the first two cards.
    pub fn reorder_by_positions(&mut self, positions: &[usize]) -> Result<(), SessionError> {
        let ids = positions
            .iter()
            .map(|&p| {
                p.checked_sub(1)
                    .and_then(|i| self.order.get(i))
                    .cloned()
                    .ok_or_else(|| SessionError::InvalidOrder(format!("no file at position {p}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.reorder(&ids)
    }

    /// Merge payload in the current order; ids without a record are skipped.
    pub fn merge_payload(&self) -> Vec<FileOrderEntry> {
        self.cards()
            .into_iter()
            .map(|c| FileOrderEntry::from(c.preview))
            .collect()
    }

    pub fn begin_merge(&mut self) -> Result<MergeTicket, SessionError> {
        let file_order = self.merge_payload();
        if file_order.is_empty() {
            self.notify(Notice::warning(SessionError::NoFiles.to_string()));
            return Err(SessionError::NoFiles);
        }
        let Some(session_id) = self.session_id.clone() else {
            self.notify(Notice::error(SessionError::NoSession.to_string()));
            return Err(SessionError::NoSession);
        };
        if let Some(old) = self.pending_merge {
            tracing::debug!(?old, "superseding pending merge");
        }
        let token = self.issue_token();
        self.pending_merge = Some(token);
        tracing::info!(files = file_order.len(), session = %session_id, "merge requested");
        Ok(MergeTicket {
            token,
            request: MergeRequest {
                session_id,
                file_order,
            },
        })
    }

    pub fn apply_merge(
        &mut self,
        token: RequestToken,
        result: Result<MergeResponse, ApiError>,
    ) -> Applied {
        if self.pending_merge != Some(token) {
            tracing::debug!(?token, "dropping stale merge result");
            return Applied::Stale;
        }
        self.pending_merge = None;

        let merged = match check_merge(result) {
            Ok(m) => m,
            Err(e) => {
                self.fail(e);
                return Applied::Failed;
            }
        };

        let default = strip_extension(&merged.filename).to_string();
        self.default_filename = default.clone();
        self.output_filename = default;
        self.saved_path = None;
        self.last_error = None;
        tracing::info!(
            merged_id = %merged.merged_id,
            files = merged.file_count,
            pages = merged.total_pages,
            "merge complete"
        );
        self.notify(Notice::success(merge_headline(merged.file_count)));
        self.merge = Some(merged);
        Applied::Adopted
    }

    /// Keystroke handler: strips forbidden characters in place.
    pub fn edit_filename(&mut self, raw: &str) -> &str {
        self.output_filename = sanitize_filename(raw);
        &self.output_filename
    }

    /// Blur handler: an empty name reverts to the default.
    pub fn commit_filename(&mut self) {
        if self.output_filename.trim().is_empty() {
            self.output_filename = self.default_filename.clone();
            let msg = format!(
                "Filename cannot be empty; using \"{}\"",
                self.default_filename
            );
            self.notify(Notice::warning(msg));
        }
    }

    pub fn download_ticket(&mut self) -> Result<DownloadTicket, SessionError> {
        let Some(merge) = self.merge.as_ref() else {
            self.notify(Notice::error(SessionError::NoMergeResult.to_string()));
            return Err(SessionError::NoMergeResult);
        };
        let filename = if self.output_filename.trim().is_empty() {
            self.default_filename.clone()
        } else {
            self.output_filename.clone()
        };
        Ok(DownloadTicket {
            merged_id: merge.merged_id.clone(),
            save_as: ensure_pdf_extension(&filename),
            filename,
        })
    }

    /// Record a finished download of `merged_id`. Downloads of a merge that has since been
    /// replaced or cleared are dropped.
    pub fn apply_download(
        &mut self,
        merged_id: &str,
        result: Result<PathBuf, ApiError>,
    ) -> Applied {
        if self.merge.as_ref().map(|m| m.merged_id.as_str()) != Some(merged_id) {
            tracing::debug!(merged_id, "dropping download of a superseded merge");
            return Applied::Stale;
        }
        match result {
            Ok(path) => {
                self.notify(Notice::success(format!("Saved {}", path.display())));
                self.saved_path = Some(path);
                Applied::Adopted
            }
            Err(e) => {
                self.fail(e);
                Applied::Failed
            }
        }
    }

    fn reset(&mut self) {
        self.records.clear();
        self.order.clear();
        self.session_id = None;
        self.merge = None;
        self.saved_path = None;
        self.pending_preview = None;
        self.pending_merge = None;
        self.last_error = None;
    }

    /// Empty the list and forget the session; pending results will be ignored.
    pub fn clear_all(&mut self) {
        self.reset();
        self.notify(Notice::info("Cleared all files"));
    }

    /// Like [`clear_all`](Self::clear_all), and also forgets filenames and queued notices.
    pub fn start_new(&mut self) {
        self.reset();
        self.default_filename.clear();
        self.output_filename.clear();
        self.outbox.clear();
    }
}

fn check_merge(result: Result<MergeResponse, ApiError>) -> Result<MergeResult, ApiError> {
    let resp = result?;
    if !resp.success {
        return Err(ApiError::Rejected(
            resp.error.unwrap_or_else(|| "Merge failed".to_string()),
        ));
    }
    let merged_id = resp
        .merged_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Malformed("merge response has no merged_id".into()))?;
    let filename = resp
        .filename
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| "merged.pdf".to_string());
    Ok(MergeResult {
        merged_id,
        filename,
        file_count: resp.file_count,
        total_pages: resp.total_pages,
        message: resp.message,
        merged_at: Some(
            time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "now".into()),
        ),
    })
}
