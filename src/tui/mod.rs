mod cards;
mod export;
mod help;
mod state;

use crate::api::MergeClient;
use crate::cli::Cli;
use crate::model::{RunConfig, SessionEvent, UiCommand};
use crate::orchestrator;
use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
    style::Style,
    text::Line,
    widgets::{Block, Borders, Tabs},
    Terminal,
};
use state::{UiState, TAB_FILES};
use std::path::PathBuf;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: RunConfig) -> Result<()> {
    let client = MergeClient::new(&cfg).context("build http client")?;

    // Unbounded channels keep the UI loop from ever waiting on the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_cfg = cfg.clone();
    let files = args.files.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_cfg, files, event_rx, cmd_tx));

    let res = orchestrator::run_controller(client, cfg.download_dir, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    cfg: RunConfig,
    files: Vec<PathBuf>,
    mut event_rx: UnboundedReceiver<SessionEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mut state = UiState::new(cfg.base_url.clone(), cfg.notice_ttl);
    let _ = cmd_tx.send(UiCommand::CheckHealth);
    if let Some(cmd) = state.add_paths(&files) {
        let _ = cmd_tx.send(cmd);
    }

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    // Redraw right away on input instead of waiting for the next tick.
    let mut dirty = true;

    let res = 'ui: loop {
        // Drain completions without blocking to keep the UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
            dirty = true;
        }

        if dirty || last_tick.elapsed() >= tick_rate {
            state.tick(Instant::now());
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
            dirty = false;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if !event::poll(Duration::from_millis(10)).unwrap_or(false) {
            continue;
        }
        let cmds = match event::read() {
            Ok(Event::Key(k)) if k.kind == KeyEventKind::Press => state.handle_key(k),
            Ok(Event::Paste(text)) => state.handle_paste(&text),
            Ok(Event::Resize(..)) => Vec::new(),
            Ok(_) => continue,
            Err(e) => break Err(e).context("read terminal event"),
        };
        dirty = true;
        for cmd in cmds {
            let quit = matches!(cmd, UiCommand::Quit);
            let _ = cmd_tx.send(cmd);
            if quit {
                break 'ui Ok(());
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, DisableBracketedPaste, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Files"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title("pdf-merge-cli"))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_FILES => cards::draw_files(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}
