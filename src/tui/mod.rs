mod clipboard;
mod help;
mod state;

use crate::cli::{build_backend, build_form, user_agent, Cli};
use crate::clock::{format_clock, local_now, CLOCK_INTERVAL_MS};
use crate::model::{FormSnapshot, PanelCommand, PanelEvent, RunningState};
use crate::orchestrator;
use crate::panel::ControlPanel;
use crate::stream::StreamMonitor;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{FormField, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PanelEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<PanelCommand>();

    let backend = build_backend(&args)?;
    let base_url = backend.base_url().to_string();
    let monitor = StreamMonitor::new(&base_url, &user_agent(), event_tx.clone())
        .context("build stream client")?;
    let panel = ControlPanel::new(backend).with_events(event_tx);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let form = build_form(&args);
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let ui_handle = std::thread::spawn(move || {
        let res = run_threaded(form, base_url, event_rx, cmd_tx);
        let _ = done_tx.send(());
        res
    });

    // A request in flight must not keep the process alive once the UI has quit.
    tokio::select! {
        _ = orchestrator::run_controller(panel, Some(monitor), args.check_on_launch, cmd_rx) => {}
        _ = done_rx => {}
    }

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    match join_res {
        Ok(Ok(res)) => res,
        Ok(Err(_)) => Err(anyhow::anyhow!("TUI thread panicked")),
        Err(e) => Err(anyhow::anyhow!("TUI join failed: {e}")),
    }
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    form: FormSnapshot,
    base_url: String,
    mut event_rx: UnboundedReceiver<PanelEvent>,
    cmd_tx: UnboundedSender<PanelCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(form, base_url);
    state.clock = format_clock(local_now());
    let _ = cmd_tx.send(PanelCommand::SelectInputType(state.form.input_type));

    let tick_rate = Duration::from_millis(100);
    let clock_rate = Duration::from_millis(CLOCK_INTERVAL_MS);
    let mut last_tick = Instant::now()
        .checked_sub(tick_rate)
        .unwrap_or_else(Instant::now);
    let mut last_clock = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            match ev {
                PanelEvent::View(v) => state.apply_view(*v),
                PanelEvent::Stream(s) => state.apply_stream(s),
            }
        }

        if last_clock.elapsed() >= clock_rate {
            state.clock = format_clock(local_now());
            last_clock = Instant::now();
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, k, &cmd_tx) == KeyOutcome::Quit {
                    let _ = cmd_tx.send(PanelCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
}

fn handle_key(
    state: &mut UiState,
    k: KeyEvent,
    cmd_tx: &UnboundedSender<PanelCommand>,
) -> KeyOutcome {
    if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
        return KeyOutcome::Quit;
    }

    // An open alert is modal, like a browser alert dialog.
    if !state.view.alerts.is_empty() {
        match k.code {
            // One dismissal per alert shown; the next view re-arms it.
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') if !state.dismiss_pending => {
                let _ = cmd_tx.send(PanelCommand::DismissAlert);
                state.dismiss_pending = true;
            }
            KeyCode::Char('q') => return KeyOutcome::Quit,
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    if state.editing.is_some() {
        match k.code {
            KeyCode::Enter => state.commit_edit(),
            KeyCode::Esc => {
                state.editing = None;
                state.info = "Edit cancelled".into();
            }
            KeyCode::Backspace => {
                if let Some(buffer) = state.editing.as_mut() {
                    buffer.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(buffer) = state.editing.as_mut() {
                    buffer.push(c);
                }
            }
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('s') => {
            if state.view.start_button.enabled {
                let _ = cmd_tx.send(PanelCommand::Start(Box::new(state.form.clone())));
            } else {
                state.info = "Start is unavailable right now".into();
            }
        }
        KeyCode::Char('x') => {
            if state.view.stop_button.enabled {
                let _ = cmd_tx.send(PanelCommand::Stop);
            } else {
                state.info = "Stop is unavailable right now".into();
            }
        }
        KeyCode::Char('i') => toggle_input_type(state, cmd_tx),
        KeyCode::Enter => {
            if state.selected_field() == Some(FormField::InputType) {
                toggle_input_type(state, cmd_tx);
            } else {
                state.begin_edit();
            }
        }
        KeyCode::Char('y') => match state.video_url() {
            Some(url) => match clipboard::copy_to_clipboard(&url) {
                Ok(()) => state.info = format!("Copied to clipboard: {url}"),
                Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
            },
            None => state.info = "No video source attached yet".into(),
        },
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(false),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(true),
        KeyCode::Tab => state.tab = (state.tab + 1) % 2,
        KeyCode::Char('?') => state.tab = 1,
        _ => {}
    }
    KeyOutcome::Continue
}

fn toggle_input_type(state: &mut UiState, cmd_tx: &UnboundedSender<PanelCommand>) {
    if !state.view.form_enabled {
        state.info = "Form is locked while surveillance is running".into();
        return;
    }
    state.form.input_type = state.form.input_type.toggled();
    let _ = cmd_tx.send(PanelCommand::SelectInputType(state.form.input_type));
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let header = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(12)].as_ref())
        .split(chunks[0]);

    let tabs = Tabs::new(vec![Line::from("Panel"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("surveillance-panel"),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, header[0]);

    let clock = Paragraph::new(state.clock.clone())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Time"));
    f.render_widget(clock, header[1]);

    match state.tab {
        0 => draw_panel(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }

    if let Some(alert) = state.view.alerts.first() {
        draw_alert(area, f, alert);
    }
}

fn button_span(label: &str, enabled: bool, color: Color) -> Span<'static> {
    let style = if enabled {
        Style::default().fg(Color::Black).bg(color)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Span::styled(format!("[ {label} ]"), style)
}

fn draw_panel(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4), // Indicator + buttons
                Constraint::Min(0),    // Form + video side-by-side
                Constraint::Length(3), // Status line
            ]
            .as_ref(),
        )
        .split(area);

    let v = &state.view;
    let indicator_color = match v.state {
        RunningState::Running => Color::Green,
        RunningState::Stopped => Color::Red,
    };
    let status = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("● ", Style::default().fg(indicator_color)),
            Span::styled(
                v.status_text.clone(),
                Style::default()
                    .fg(indicator_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            button_span(&v.start_button.label, v.start_button.enabled, Color::Green),
            Span::raw("  "),
            button_span(&v.stop_button.label, v.stop_button.enabled, Color::Red),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Surveillance"));
    f.render_widget(status, main[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[1]);
    draw_form(body[0], f, state);
    draw_video(body[1], f, state);

    let info = Paragraph::new(state.info.clone())
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(info, main[2]);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let enabled = state.view.form_enabled;
    let selected = state.selected_field();
    let mut lines = Vec::new();

    for field in state.fields() {
        let is_selected = selected == Some(field);
        let marker = if is_selected { "▸ " } else { "  " };
        let value = match (&state.editing, is_selected) {
            (Some(buf), true) => format!("{buf}_"),
            _ => field.display_value(&state.form),
        };
        let value_style = if !enabled {
            Style::default().fg(Color::DarkGray)
        } else if is_selected {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(marker),
            Span::styled(
                format!("{:<15}", format!("{}:", field.label())),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(value, value_style),
        ]));
    }

    let title = if enabled { "Settings" } else { "Settings (locked)" };
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_video(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let label = |s: &str| Span::styled(format!("{s}: "), Style::default().fg(Color::Gray));
    let mut lines = vec![Line::from(vec![
        label("Source"),
        Span::raw(state.view.video_source.clone().unwrap_or_else(|| "-".into())),
    ])];

    if let Some(s) = state.stream.as_ref() {
        let (text, color) = match (&s.error, s.live) {
            (Some(e), _) => (format!("error: {e}"), Color::Red),
            (None, true) => ("live".to_string(), Color::Green),
            (None, false) => ("idle".to_string(), Color::Gray),
        };
        lines.push(Line::from(vec![
            label("Feed"),
            Span::styled(text, Style::default().fg(color)),
        ]));
        lines.push(Line::from(vec![
            label("Frames"),
            Span::raw(format!("{} ({:.1} fps)", s.frames, s.fps)),
        ]));
        lines.push(Line::from(vec![
            label("Received"),
            Span::raw(format!("{:.1} KiB", s.bytes as f64 / 1024.0)),
        ]));
        if let Some(n) = s.last_frame_bytes {
            lines.push(Line::from(vec![
                label("Last frame"),
                Span::raw(format!("{:.1} KiB", n as f64 / 1024.0)),
            ]));
        }
    }

    if let Some(server) = state
        .view
        .server
        .as_ref()
        .and_then(crate::text_summary::describe_server)
    {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![label("Server"), Span::raw(server)]));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Video"));
    f.render_widget(p, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

fn draw_alert(area: Rect, f: &mut ratatui::Frame, message: &str) {
    let popup = centered(area, 60, 7);
    f.render_widget(Clear, popup);
    let p = Paragraph::new(vec![
        Line::from(message.to_string()),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::Gray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title("Alert"),
    );
    f.render_widget(p, popup);
}
