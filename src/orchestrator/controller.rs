//! Request controller.
//!
//! Executes preview, merge, download and health requests as tokio tasks and emits their
//! completions for presentation layers. Session bookkeeping stays with the caller.

use crate::api::MergeClient;
use crate::error::ApiError;
use crate::model::{SessionEvent, UiCommand};
use crate::notify::Notice;
use crate::session::{DownloadTicket, MergeTicket, PreviewTicket};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Handles of requests still in flight.
#[derive(Default)]
struct InFlight {
    preview: Option<JoinHandle<()>>,
    merge: Option<JoinHandle<()>>,
    others: Vec<JoinHandle<()>>,
}

impl InFlight {
    fn abort_all(&mut self) -> usize {
        let mut aborted = 0;
        let handles = self
            .preview
            .take()
            .into_iter()
            .chain(self.merge.take())
            .chain(self.others.drain(..));
        for h in handles {
            if !h.is_finished() {
                aborted += 1;
            }
            h.abort();
        }
        aborted
    }

    fn reap(&mut self) {
        self.others.retain(|h| !h.is_finished());
    }
}

fn spawn_preview(
    client: &MergeClient,
    ticket: PreviewTicket,
    event_tx: UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    let client = client.clone();
    tokio::spawn(async move {
        let result = client
            .upload_preview(ticket.session_id.as_deref(), &ticket.files)
            .await;
        let _ = event_tx.send(SessionEvent::PreviewFinished {
            token: ticket.token,
            result,
        });
    })
}

fn spawn_merge(
    client: &MergeClient,
    ticket: MergeTicket,
    event_tx: UnboundedSender<SessionEvent>,
) -> JoinHandle<()> {
    let client = client.clone();
    tokio::spawn(async move {
        let result = client.merge_ordered(&ticket.request).await;
        let _ = event_tx.send(SessionEvent::MergeFinished {
            token: ticket.token,
            result,
        });
    })
}

/// Download a merged file into `dir`, returning the path it was saved under.
pub(crate) async fn download_to(
    client: &MergeClient,
    dir: &Path,
    ticket: &DownloadTicket,
) -> Result<PathBuf, ApiError> {
    let url = client.download_url(&ticket.merged_id, &ticket.filename)?;
    let resp = client.download(url).await?;
    crate::storage::save_stream(dir, &ticket.save_as, Box::pin(resp.bytes_stream()))
        .await
        .map_err(|e| ApiError::Io(format!("{e:#}")))
}

/// Execute UI commands until `Quit` (or the command channel closes).
pub(crate) async fn run_controller(
    client: MergeClient,
    download_dir: PathBuf,
    event_tx: UnboundedSender<SessionEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut inflight = InFlight::default();

    while let Some(cmd) = cmd_rx.recv().await {
        inflight.reap();
        match cmd {
            UiCommand::Preview(ticket) => {
                inflight.preview = Some(spawn_preview(&client, ticket, event_tx.clone()));
            }
            UiCommand::Merge(ticket) => {
                // Latest merge wins; the superseded one would be dropped as stale anyway.
                if let Some(old) = inflight.merge.take() {
                    old.abort();
                }
                inflight.merge = Some(spawn_merge(&client, ticket, event_tx.clone()));
            }
            UiCommand::Download(ticket) => {
                let client = client.clone();
                let dir = download_dir.clone();
                let tx = event_tx.clone();
                inflight.others.push(tokio::spawn(async move {
                    let result = download_to(&client, &dir, &ticket).await;
                    let _ = tx.send(SessionEvent::DownloadFinished {
                        merged_id: ticket.merged_id,
                        result,
                    });
                }));
            }
            UiCommand::CheckHealth => {
                let client = client.clone();
                let tx = event_tx.clone();
                inflight.others.push(tokio::spawn(async move {
                    let _ = tx.send(SessionEvent::Health(client.health().await));
                }));
            }
            UiCommand::CancelAll => {
                let aborted = inflight.abort_all();
                if aborted > 0 {
                    tracing::info!(aborted, "cancelled in-flight requests");
                    let _ = event_tx.send(SessionEvent::Notice(Notice::info(format!(
                        "Cancelled {}",
                        crate::format::plural(aborted, "request", "requests")
                    ))));
                }
            }
            UiCommand::Quit => break,
        }
    }

    inflight.abort_all();
    Ok(())
}
