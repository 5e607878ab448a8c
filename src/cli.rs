use crate::api::MergeClient;
use crate::config::{self, Overrides};
use crate::model::RunConfig;
use crate::notify::Notice;
use crate::session::{collect_candidates, Applied, SessionState};
use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "pdf-merge-cli",
    version,
    about = "Upload, reorder and merge PDFs through a merge server, with an optional TUI"
)]
pub struct Cli {
    /// PDF files or folders of PDFs to upload
    pub files: Vec<PathBuf>,

    /// Base URL of the merge server [env: PDF_MERGE_BASE_URL] [default: http://127.0.0.1:5000]
    #[arg(long)]
    pub base_url: Option<String>,

    /// Merge order as 1-based positions of the uploaded files, e.g. 2,1,3
    #[arg(long, value_delimiter = ',')]
    pub order: Option<Vec<usize>>,

    /// Output filename (forbidden characters are stripped; `.pdf` is added when missing)
    #[arg(long)]
    pub name: Option<String>,

    /// Directory to save the merged PDF into [env: PDF_MERGE_DOWNLOAD_DIR]
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Merge but do not download the result
    #[arg(long)]
    pub no_download: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Print a JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Query the server health endpoint and exit
    #[arg(long)]
    pub check: bool,

    /// Per-request timeout (no timeout by default)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// How long notices stay on screen in the TUI
    #[arg(long)]
    pub notice_ttl: Option<humantime::Duration>,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn is_one_shot(&self) -> bool {
        self.text || self.json || self.check
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            download_dir: self.output_dir.clone(),
            timeout: self.timeout.map(Duration::from),
            notice_ttl: self.notice_ttl.map(Duration::from),
        }
    }
}

/// Build a `RunConfig` from the config file, the environment and CLI arguments.
pub fn build_config(args: &Cli) -> Result<RunConfig> {
    let file = config::load_file(args.config.as_deref())?;
    Ok(config::resolve(file, args.overrides(), |key| {
        std::env::var(key).ok()
    }))
}

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args)?;

    if !args.is_one_shot() {
        #[cfg(feature = "tui")]
        {
            let log_path = crate::logging::init_file()?;
            tracing::info!(log = %log_path.display(), base_url = %cfg.base_url, "starting tui");
            return crate::tui::run(args, cfg).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            crate::logging::init_stderr();
            return run_one_shot(args, cfg).await;
        }
    }

    crate::logging::init_stderr();
    if args.check {
        return run_check(args, cfg).await;
    }
    run_one_shot(args, cfg).await
}

async fn run_check(args: Cli, cfg: RunConfig) -> Result<()> {
    let client = MergeClient::new(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let res = client.health().await;
    let outcome = match res {
        Ok(status) => {
            let line = if args.json {
                serde_json::to_string_pretty(&status)?
            } else {
                format!(
                    "{}: {} ({})",
                    client.base_url(),
                    status.status,
                    status.timestamp.as_deref().unwrap_or("-")
                )
            };
            let _ = out_tx.send(OutputLine::Stdout(line));
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("{} is not reachable", client.base_url())),
    };
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

/// Routes notices and summaries for a one-shot run.
pub(crate) struct Sink {
    out_tx: mpsc::UnboundedSender<OutputLine>,
    json: bool,
    collected: Vec<Notice>,
}

impl Sink {
    pub(crate) fn new(out_tx: mpsc::UnboundedSender<OutputLine>, json: bool) -> Self {
        Self {
            out_tx,
            json,
            collected: Vec::new(),
        }
    }

    fn notices(&mut self, notices: Vec<Notice>) {
        for n in notices {
            if !self.json {
                let _ = self.out_tx.send(OutputLine::Stderr(n.to_string()));
            }
            self.collected.push(n);
        }
    }

    fn lines(&self, lines: Vec<String>) {
        if self.json {
            return;
        }
        for line in lines {
            let _ = self.out_tx.send(OutputLine::Stdout(line));
        }
    }
}

/// Upload, reorder, merge, rename and download in one pass.
pub(crate) async fn drive_session(
    args: &Cli,
    client: &MergeClient,
    download_dir: &std::path::Path,
    session: &mut SessionState,
    sink: &mut Sink,
) -> Result<()> {
    if args.files.is_empty() {
        bail!("no input files; pass one or more PDFs or folders");
    }

    let (candidates, problems) = collect_candidates(&args.files);
    sink.notices(problems);
    let ticket = session.select(candidates);
    sink.notices(session.take_notices());
    let Some(ticket) = ticket else {
        bail!("none of the given files can be uploaded");
    };

    let result = client
        .upload_preview(ticket.session_id.as_deref(), &ticket.files)
        .await;
    let applied = session.apply_preview(ticket.token, result);
    sink.notices(session.take_notices());
    if applied != Applied::Adopted {
        return Err(last_error(session)).context("upload failed");
    }

    if let Some(order) = args.order.as_deref() {
        session.reorder_by_positions(order)?;
    }
    sink.lines(crate::text_summary::build_preview_summary(session).lines);

    let ticket = session.begin_merge();
    sink.notices(session.take_notices());
    let ticket = ticket?;
    let result = client.merge_ordered(&ticket.request).await;
    let applied = session.apply_merge(ticket.token, result);
    sink.notices(session.take_notices());
    if applied != Applied::Adopted {
        return Err(last_error(session)).context("merge failed");
    }

    if let Some(name) = args.name.as_deref() {
        session.edit_filename(name);
        session.commit_filename();
        sink.notices(session.take_notices());
    }

    if !args.no_download {
        let ticket = session.download_ticket()?;
        let result = crate::orchestrator::download_to(client, download_dir, &ticket).await;
        let applied = session.apply_download(&ticket.merged_id, result);
        sink.notices(session.take_notices());
        if applied != Applied::Adopted {
            return Err(last_error(session)).context("download failed");
        }
    }

    sink.lines(crate::text_summary::build_merge_summary(session).lines);
    Ok(())
}

fn last_error(session: &SessionState) -> anyhow::Error {
    match session.last_error() {
        Some(e) => anyhow!(e.clone()),
        None => anyhow!("request was not applied"),
    }
}

async fn run_one_shot(args: Cli, cfg: RunConfig) -> Result<()> {
    let client = MergeClient::new(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let mut sink = Sink::new(out_tx.clone(), args.json);
    let mut session = SessionState::new();

    let outcome = drive_session(&args, &client, &cfg.download_dir, &mut session, &mut sink).await;

    if args.json {
        let report = crate::text_summary::build_json_report(&session, sink.collected);
        let out = serde_json::to_string_pretty(&report)?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    }
    drop(out_tx);
    let _ = out_handle.await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spawn_mock, test_config, write_pdfs};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pdf-merge-cli").chain(args.iter().copied())).unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<OutputLine>) -> (Vec<String>, Vec<String>) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        while let Ok(line) = rx.try_recv() {
            match line {
                OutputLine::Stdout(l) => out.push(l),
                OutputLine::Stderr(l) => err.push(l),
            }
        }
        (out, err)
    }

    #[test]
    fn parses_order_and_durations() {
        let cli = parse(&["a.pdf", "b.pdf", "--order", "2,1", "--timeout", "30s", "--text"]);
        assert_eq!(cli.files.len(), 2);
        assert_eq!(cli.order, Some(vec![2, 1]));
        assert!(cli.is_one_shot());
        assert_eq!(cli.overrides().timeout, Some(Duration::from_secs(30)));
        assert!(Cli::try_parse_from(["pdf-merge-cli", "--text", "--json"]).is_err());
        assert!(!parse(&[]).is_one_shot());
    }

    #[tokio::test]
    async fn one_shot_merges_in_requested_order_and_saves() {
        let (base, mock) = spawn_mock().await;
        let dir = tempfile::tempdir().unwrap();
        let paths = write_pdfs(dir.path(), &["a.pdf", "b.pdf", "c.pdf"]);
        let out_dir = dir.path().join("out");
        let client = MergeClient::new(&test_config(&base, &out_dir)).unwrap();

        let mut args = parse(&["--order", "3,1,2", "--name", "final:draft", "--text"]);
        args.files = paths;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Sink::new(tx, false);
        let mut session = SessionState::new();
        drive_session(&args, &client, &out_dir, &mut session, &mut sink)
            .await
            .unwrap();

        let saved = session.saved_path().unwrap().to_path_buf();
        assert_eq!(saved, out_dir.join("finaldraft.pdf"));
        assert_eq!(
            std::fs::read_to_string(&saved).unwrap(),
            "%PDF-1.7 sess-1_2,sess-1_0,sess-1_1"
        );
        mock.with(|inner| assert_eq!(inner.merges.len(), 1));

        let (out, err) = drain(&mut rx);
        assert!(out.iter().any(|l| l == "3 PDFs have been merged successfully"));
        assert!(out.iter().any(|l| l.starts_with("Saved: ")));
        assert!(err.iter().any(|l| l == "[ok] Added 3 files"), "{err:?}");
    }

    #[tokio::test]
    async fn one_shot_reports_server_failure() {
        let (base, mock) = spawn_mock().await;
        mock.with(|inner| inner.fail_merge = true);
        let dir = tempfile::tempdir().unwrap();
        let client = MergeClient::new(&test_config(&base, dir.path())).unwrap();

        let mut args = parse(&["--json", "--no-download"]);
        args.files = write_pdfs(dir.path(), &["a.pdf"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = Sink::new(tx, true);
        let mut session = SessionState::new();
        let err = drive_session(&args, &client, dir.path(), &mut session, &mut sink)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("An error occurred while processing PDFs"));
        assert!(session.merge_result().is_none());
        assert_eq!(session.len(), 1);
        // JSON mode keeps notices for the report instead of printing them.
        let (out, err_lines) = drain(&mut rx);
        assert!(out.is_empty() && err_lines.is_empty());
        assert!(sink
            .collected
            .iter()
            .any(|n| n.level == crate::notify::NoticeLevel::Error));
    }

    #[tokio::test]
    async fn one_shot_rejects_bad_order() {
        let (base, _mock) = spawn_mock().await;
        let dir = tempfile::tempdir().unwrap();
        let client = MergeClient::new(&test_config(&base, dir.path())).unwrap();

        let mut args = parse(&["--order", "1,5", "--text"]);
        args.files = write_pdfs(dir.path(), &["a.pdf", "b.pdf"]);
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut sink = Sink::new(tx, false);
        let mut session = SessionState::new();
        let err = drive_session(&args, &client, dir.path(), &mut session, &mut sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no file at position 5"), "{err}");
    }
}
