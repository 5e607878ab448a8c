use crate::error::ApiError;
use crate::model::{HealthStatus, MergeRequest, MergeResponse, PreviewResponse, RunConfig};
use crate::session::{LocalFile, PDF_MIME};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use url::Url;

/// Longest slice of a non-JSON error body carried into an error message.
const MAX_BODY_SNIPPET: usize = 200;

/// Client for the preview, merge, download and health endpoints.
#[derive(Debug, Clone)]
pub struct MergeClient {
    pub(crate) http: reqwest::Client,
    base_url: Url,
}

impl MergeClient {
    pub fn new(cfg: &RunConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&cfg.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url {}: {e}", cfg.base_url)))?;
        // Url::join drops the last path segment unless the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::Transport(format!("bad endpoint {path}: {e}")))
    }

    /// `POST /upload-preview` with one `pdf_files` part per file.
    pub async fn upload_preview(
        &self,
        session_id: Option<&str>,
        files: &[LocalFile],
    ) -> Result<PreviewResponse, ApiError> {
        let mut form = Form::new();
        for file in files {
            let data = tokio::fs::read(&file.path).await?;
            let part = Part::bytes(data)
                .file_name(file.name.clone())
                .mime_str(PDF_MIME)?;
            form = form.part("pdf_files", part);
        }
        if let Some(id) = session_id {
            form = form.text("existing_session", id.to_string());
        }

        let url = self.endpoint("upload-preview")?;
        tracing::debug!(%url, files = files.len(), "uploading for preview");
        let resp = self.http.post(url).multipart(form).send().await?;
        decode_json(resp).await
    }

    /// `POST /merge-ordered`
    pub async fn merge_ordered(&self, request: &MergeRequest) -> Result<MergeResponse, ApiError> {
        let url = self.endpoint("merge-ordered")?;
        tracing::debug!(%url, files = request.file_order.len(), "requesting merge");
        let resp = self.http.post(url).json(request).send().await?;
        decode_json(resp).await
    }

    /// `GET /download-merged/{merged_id}?filename=<name>`
    pub fn download_url(&self, merged_id: &str, filename: &str) -> Result<Url, ApiError> {
        let mut url = self.endpoint("download-merged/")?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport("base url cannot carry a path".into()))?
            .pop_if_empty()
            .push(merged_id);
        if !filename.is_empty() {
            url.query_pairs_mut().append_pair("filename", filename);
        }
        Ok(url)
    }

    /// Start the download; the caller streams the body.
    pub async fn download(&self, url: Url) -> Result<reqwest::Response, ApiError> {
        tracing::debug!(%url, "downloading merged file");
        let resp = self.http.get(url).send().await?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        Err(status_error(resp).await)
    }

    /// `GET /api/health`
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        let url = self.endpoint("api/health")?;
        let resp = self.http.get(url).send().await?;
        decode_json(resp).await
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// Turn a non-2xx response into an error, preferring the server's `{error}` text.
async fn status_error(resp: reqwest::Response) -> ApiError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(b) => b.error,
        Err(_) if body.trim().is_empty() => "no response body".to_string(),
        Err(_) => body.chars().take(MAX_BODY_SNIPPET).collect(),
    };
    ApiError::Status { status, message }
}

async fn decode_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    if !resp.status().is_success() {
        return Err(status_error(resp).await);
    }
    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| ApiError::Malformed(e.to_string()))
}
