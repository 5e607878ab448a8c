//! In-process stand-in for the merge service, used by client and controller tests.

use crate::model::{FilePreview, MergeRequest, RunConfig};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub(crate) struct RecordedUpload {
    pub existing_session: Option<String>,
    /// (file name, content type, byte count)
    pub files: Vec<(String, Option<String>, usize)>,
}

#[derive(Default)]
pub(crate) struct MockInner {
    pub uploads: Vec<RecordedUpload>,
    pub merges: Vec<MergeRequest>,
    pub downloads: Vec<(String, Option<String>)>,
    pub fail_merge: bool,
    pub merge_delay: Duration,
    sessions: HashMap<String, Vec<FilePreview>>,
    merged: HashMap<String, Vec<String>>,
    next_session: u32,
    next_merge: u32,
}

#[derive(Clone, Default)]
pub(crate) struct MockState(pub Arc<Mutex<MockInner>>);

impl MockState {
    pub fn with<R>(&self, f: impl FnOnce(&mut MockInner) -> R) -> R {
        let mut guard = self.0.lock().unwrap();
        f(&mut guard)
    }
}

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode, msg: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": msg })))
}

async fn upload_preview(State(state): State<MockState>, mut multipart: Multipart) -> Reply {
    let mut existing = None;
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| reject(StatusCode::BAD_REQUEST, "bad multipart"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "existing_session" {
            existing = Some(field.text().await.unwrap_or_default());
        } else if name == "pdf_files" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let data = field.bytes().await.unwrap_or_default();
            files.push((file_name, content_type, data.len()));
        }
    }
    if files.is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "No files uploaded"));
    }

    state.with(|inner| {
        inner.uploads.push(RecordedUpload {
            existing_session: existing.clone(),
            files: files.clone(),
        });
        let session_id = match existing.filter(|s| inner.sessions.contains_key(s)) {
            Some(s) => s,
            None => {
                inner.next_session += 1;
                let s = format!("sess-{}", inner.next_session);
                inner.sessions.insert(s.clone(), Vec::new());
                s
            }
        };
        let stored = inner.sessions.entry(session_id.clone()).or_default();
        let mut previews = Vec::new();
        for (name, _, size) in files {
            let index = stored.len() as u32;
            let preview = FilePreview {
                id: format!("{session_id}_{index}"),
                filename: name.clone(),
                size: size as u64,
                pages: 1,
                thumbnail: None,
                file_index: index,
                file_path: format!("{index}_{name}"),
                safe_filename: Some(format!("{index}_{name}")),
                session_id: Some(session_id.clone()),
            };
            stored.push(preview.clone());
            previews.push(preview);
        }
        Ok(Json(json!({
            "success": true,
            "session_id": session_id,
            "previews": previews,
        })))
    })
}

async fn merge_ordered(State(state): State<MockState>, Json(req): Json<MergeRequest>) -> Reply {
    let delay = state.with(|inner| inner.merge_delay);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    state.with(|inner| {
        inner.merges.push(req.clone());
        if inner.fail_merge {
            return Err(reject(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while processing PDFs",
            ));
        }
        let Some(stored) = inner.sessions.get(&req.session_id) else {
            return Err(reject(StatusCode::BAD_REQUEST, "Session expired or invalid"));
        };
        let ids: Vec<String> = req
            .file_order
            .iter()
            .filter(|e| stored.iter().any(|s| s.id == e.id))
            .map(|e| e.id.clone())
            .collect();
        if ids.is_empty() {
            return Err(reject(StatusCode::BAD_REQUEST, "No valid files could be processed"));
        }
        inner.next_merge += 1;
        let merged_id = format!("merged-{}", inner.next_merge);
        let count = ids.len();
        inner.merged.insert(merged_id.clone(), ids);
        Ok(Json(json!({
            "success": true,
            "merged_id": merged_id,
            "filename": format!("merged_{count}_files_{count}_pages_20240101_120000.pdf"),
            "file_count": count,
            "total_pages": count,
            "message": format!("Successfully merged {count} PDF(s) with {count} pages"),
        })))
    })
}

async fn download_merged(
    State(state): State<MockState>,
    Path(merged_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.with(|inner| {
        inner
            .downloads
            .push((merged_id.clone(), query.get("filename").cloned()));
        match inner.merged.get(&merged_id) {
            Some(ids) => (
                [(header::CONTENT_TYPE, "application/pdf")],
                format!("%PDF-1.7 {}", ids.join(",")),
            )
                .into_response(),
            None => reject(StatusCode::NOT_FOUND, "Merged PDF not found or expired").into_response(),
        }
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": "2024-01-01T12:00:00" }))
}

pub(crate) fn mock_router(state: MockState) -> Router {
    Router::new()
        .route("/upload-preview", post(upload_preview))
        .route("/merge-ordered", post(merge_ordered))
        .route("/download-merged/:merged_id", get(download_merged))
        .route("/api/health", get(health))
        .with_state(state)
}

pub(crate) async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

pub(crate) async fn spawn_mock() -> (String, MockState) {
    let state = MockState::default();
    let base = serve(mock_router(state.clone())).await;
    (base, state)
}

pub(crate) fn test_config(base_url: &str, download_dir: &std::path::Path) -> RunConfig {
    RunConfig {
        base_url: base_url.to_string(),
        download_dir: download_dir.to_path_buf(),
        timeout: Some(Duration::from_secs(10)),
        notice_ttl: Duration::from_secs(4),
        user_agent: "pdf-merge-cli-tests".to_string(),
    }
}

/// Write small fake PDFs into `dir` and return their paths.
pub(crate) fn write_pdfs(dir: &std::path::Path, names: &[&str]) -> Vec<std::path::PathBuf> {
    names
        .iter()
        .map(|n| {
            let p = dir.join(n);
            std::fs::write(&p, format!("%PDF-1.4 {n}")).unwrap();
            p
        })
        .collect()
}
