use crate::backend::HttpBackend;
use crate::model::{FormSnapshot, InputType};
use crate::panel::ControlPanel;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
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

/// One-shot operations for scripting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    Status,
    Start,
    Stop,
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "surveillance-panel",
    version,
    about = "Control panel for a video surveillance backend"
)]
pub struct Cli {
    /// Base URL of the surveillance service
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Per-request timeout for status/start/stop calls (0s disables it)
    #[arg(long, default_value = "30s")]
    pub request_timeout: humantime::Duration,

    /// Run a single action and exit (no TUI)
    #[arg(long, value_enum)]
    pub action: Option<Action>,

    /// Print the resulting panel state as JSON (requires --action)
    #[arg(long)]
    pub json: bool,

    /// Write logs to this file (TUI mode defaults to the user cache directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Query the service status when the panel opens
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub check_on_launch: bool,

    /// Capture source
    #[arg(long, value_enum, default_value_t = InputType::Camera)]
    pub input_type: InputType,

    /// Video file to upload when the input type is video
    #[arg(long)]
    pub video_file: Option<PathBuf>,

    /// Bot token used by the service for detection alerts
    #[arg(long, default_value = "")]
    pub token: String,

    /// Chat that receives detection alerts
    #[arg(long, default_value = "")]
    pub chat_id: String,

    /// Start of the daily active window (HH:MM:SS)
    #[arg(long, default_value = "00:00:00")]
    pub from_time: String,

    /// End of the daily active window (HH:MM:SS)
    #[arg(long, default_value = "23:59:59")]
    pub to_time: String,

    /// Playback speed for uploaded video files
    #[arg(long, default_value_t = 1.0)]
    pub playback_speed: f64,

    /// Frame rate the service should process at
    #[arg(long, default_value_t = 15.0)]
    pub target_fps: f64,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.action.is_some() || cfg!(not(feature = "tui"))
    }
}

pub fn user_agent() -> String {
    format!("surveillance-panel/{}", env!("CARGO_PKG_VERSION"))
}

/// Initial form contents from CLI arguments.
pub fn build_form(args: &Cli) -> FormSnapshot {
    FormSnapshot {
        input_type: args.input_type,
        video_file: args.video_file.clone(),
        token: args.token.clone(),
        chat_id: args.chat_id.clone(),
        from_time: args.from_time.clone(),
        to_time: args.to_time.clone(),
        playback_speed: args.playback_speed,
        target_fps: args.target_fps,
    }
}

pub fn build_backend(args: &Cli) -> Result<HttpBackend> {
    let timeout = Duration::from(args.request_timeout);
    let timeout = (!timeout.is_zero()).then_some(timeout);
    HttpBackend::new(&args.base_url, timeout, &user_agent())
}

pub async fn run(args: Cli) -> Result<()> {
    if args.json && args.action.is_none() {
        return Err(anyhow::anyhow!(
            "--json can only be used with --action. Use --action status --json."
        ));
    }

    if let Some(action) = args.action {
        return run_action(args, action).await;
    }

    #[cfg(feature = "tui")]
    {
        crate::tui::run(args).await
    }
    #[cfg(not(feature = "tui"))]
    {
        // Fallback when built without TUI support.
        run_action(args, Action::Status).await
    }
}

/// Drive one panel operation the way the page would: status first, then the action.
async fn run_action(args: Cli, action: Action) -> Result<()> {
    let backend = build_backend(&args)?;
    let mut panel = ControlPanel::new(backend);
    let (out_tx, out_handle) = spawn_output_writer();

    panel.check_status().await;

    let mut refused = None;
    match action {
        Action::Status => {}
        Action::Start => {
            if panel.view().start_button.enabled {
                let form = build_form(&args);
                panel.toggle_input_type_view(form.input_type);
                panel.start(form).await;
            } else {
                refused = Some("surveillance is already running");
            }
        }
        Action::Stop => {
            if panel.view().stop_button.enabled {
                panel.stop().await;
            } else {
                refused = Some("surveillance is not running");
            }
        }
    }

    let view = panel.view();
    if args.json {
        let out = serde_json::to_string_pretty(view).context("serialize panel state")?;
        let _ = out_tx.send(OutputLine::Stdout(out));
    } else {
        let summary = crate::text_summary::build_text_summary(view);
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    for alert in &view.alerts {
        let _ = out_tx.send(OutputLine::Stderr(format!("Alert: {alert}")));
    }
    let failed = refused.map(str::to_string).or_else(|| {
        (!view.alerts.is_empty()).then(|| format!("{action:?} did not succeed"))
    });

    drop(out_tx);
    let _ = out_handle.await;

    match failed {
        Some(msg) => Err(anyhow::anyhow!(msg)),
        None => Ok(()),
    }
}
