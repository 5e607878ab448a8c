use crate::error::ApiError;
use crate::notify::Notice;
use crate::session::{DownloadTicket, MergeTicket, PreviewTicket, RequestToken};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved runtime settings shared by the one-shot and TUI flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub base_url: String,
    pub download_dir: PathBuf,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub notice_ttl: Duration,
    pub user_agent: String,
}

/// One uploaded file as described by the preview endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilePreview {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub file_index: u32,
    pub file_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub previews: Vec<FilePreview>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Entry of the merge payload; order in the enclosing list is the merge order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOrderEntry {
    pub id: String,
    pub filename: String,
    pub file_index: u32,
    pub file_path: String,
}

impl From<&FilePreview> for FileOrderEntry {
    fn from(p: &FilePreview) -> Self {
        Self {
            id: p.id.clone(),
            filename: p.filename.clone(),
            file_index: p.file_index,
            file_path: p.file_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub session_id: String,
    pub file_order: Vec<FileOrderEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub merged_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_count: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// An adopted merge, the target of rename and download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged_id: String,
    pub filename: String,
    pub file_count: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Commands emitted by presentation layers and executed by the orchestrator.
#[derive(Debug)]
pub enum UiCommand {
    Preview(PreviewTicket),
    Merge(MergeTicket),
    Download(DownloadTicket),
    CheckHealth,
    /// Abort every in-flight request (session reset).
    CancelAll,
    Quit,
}

/// Completions reported back to the presentation layer.
#[derive(Debug)]
pub enum SessionEvent {
    PreviewFinished {
        token: RequestToken,
        result: Result<PreviewResponse, ApiError>,
    },
    MergeFinished {
        token: RequestToken,
        result: Result<MergeResponse, ApiError>,
    },
    DownloadFinished {
        merged_id: String,
        result: Result<PathBuf, ApiError>,
    },
    Health(Result<HealthStatus, ApiError>),
    Notice(Notice),
}
