use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const VIDEO_FEED_PATH: &str = "/video_feed";
pub const PLACEHOLDER_PATH: &str = "/static/img/placeholder.jpg";

pub const START_LABEL: &str = "Start Surveillance";
pub const STARTING_LABEL: &str = "Starting...";
pub const STOP_LABEL: &str = "Stop Surveillance";
pub const STOPPING_LABEL: &str = "Stopping...";

/// Source the backend should capture from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum InputType {
    Camera,
    Video,
}

impl InputType {
    /// Value sent in the `input_type` form field.
    pub fn as_form_value(self) -> &'static str {
        match self {
            InputType::Camera => "Camera",
            InputType::Video => "Video",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            InputType::Camera => InputType::Video,
            InputType::Video => InputType::Camera,
        }
    }
}

/// Transient capture of the form, submitted once with a start request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub input_type: InputType,
    pub video_file: Option<PathBuf>,
    pub token: String,
    pub chat_id: String,
    pub from_time: String,
    pub to_time: String,
    pub playback_speed: f64,
    pub target_fps: f64,
}

impl Default for FormSnapshot {
    fn default() -> Self {
        Self {
            input_type: InputType::Camera,
            video_file: None,
            token: String::new(),
            chat_id: String::new(),
            from_time: "00:00:00".into(),
            to_time: "23:59:59".into(),
            playback_speed: 1.0,
            target_fps: 15.0,
        }
    }
}

impl FormSnapshot {
    pub fn has_video_file(&self) -> bool {
        self.video_file
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }

    /// Plain text fields in the order the backend form declares them.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("input_type", self.input_type.as_form_value().to_string()),
            ("token", self.token.clone()),
            ("chat_id", self.chat_id.clone()),
            ("from_time", self.from_time.clone()),
            ("to_time", self.to_time.clone()),
            ("playback_speed", self.playback_speed.to_string()),
            ("target_fps", self.target_fps.to_string()),
        ]
    }
}

/// Body of `GET /status`. Only `is_running` is required.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub is_running: bool,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub from_time: Option<String>,
    #[serde(default)]
    pub to_time: Option<String>,
    #[serde(default)]
    pub playback_speed: Option<f64>,
    #[serde(default)]
    pub target_fps: Option<f64>,
}

/// Body of the start/stop endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReply {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ActionReply {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    pub fn message_or_default(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown error")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunningState {
    Stopped,
    Running,
}

impl RunningState {
    pub fn indicator_class(self) -> &'static str {
        match self {
            RunningState::Stopped => "offline",
            RunningState::Running => "online",
        }
    }

    pub fn status_text(self) -> &'static str {
        match self {
            RunningState::Stopped => "Offline",
            RunningState::Running => "Online",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ButtonView {
    pub enabled: bool,
    pub label: String,
}

impl ButtonView {
    pub fn new(enabled: bool, label: &str) -> Self {
        Self {
            enabled,
            label: label.to_string(),
        }
    }
}

/// Everything a presentation layer needs to draw the panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub state: RunningState,
    pub start_button: ButtonView,
    pub stop_button: ButtonView,
    pub indicator_class: String,
    pub status_text: String,
    pub form_enabled: bool,
    pub upload_visible: bool,
    pub video_source: Option<String>,
    pub alerts: Vec<String>,
    /// Settings reported by the last successful status check.
    pub server: Option<StatusReport>,
}

impl Default for PanelView {
    fn default() -> Self {
        let state = RunningState::Stopped;
        Self {
            state,
            start_button: ButtonView::new(true, START_LABEL),
            stop_button: ButtonView::new(false, STOP_LABEL),
            indicator_class: state.indicator_class().to_string(),
            status_text: state.status_text().to_string(),
            form_enabled: true,
            upload_visible: false,
            video_source: None,
            alerts: Vec::new(),
            server: None,
        }
    }
}

/// Counters for the stream currently attached as the video source.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StreamStats {
    pub url: String,
    pub frames: u64,
    pub bytes: u64,
    pub last_frame_bytes: Option<u64>,
    pub fps: f64,
    pub live: bool,
    pub error: Option<String>,
}

/// Commands emitted by UI layers and handled by the controller task in order.
#[derive(Debug, Clone)]
pub enum PanelCommand {
    SelectInputType(InputType),
    Start(Box<FormSnapshot>),
    Stop,
    DismissAlert,
    Quit,
}

impl PanelCommand {
    /// Short name for logs; form contents may hold credentials.
    pub fn name(&self) -> &'static str {
        match self {
            PanelCommand::SelectInputType(_) => "select_input_type",
            PanelCommand::Start(_) => "start",
            PanelCommand::Stop => "stop",
            PanelCommand::DismissAlert => "dismiss_alert",
            PanelCommand::Quit => "quit",
        }
    }
}

/// Updates emitted by the controller task for presentation layers.
#[derive(Debug, Clone)]
pub enum PanelEvent {
    View(Box<PanelView>),
    Stream(StreamStats),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_report_only_requires_is_running() {
        let r: StatusReport = serde_json::from_str(r#"{"is_running": true}"#).unwrap();
        assert!(r.is_running);
        assert_eq!(r.input_type, None);

        let full: StatusReport = serde_json::from_str(
            r#"{"is_running": false, "input_type": "Video", "from_time": "08:00:00",
                "to_time": "18:00:00", "playback_speed": 2.0, "target_fps": 10}"#,
        )
        .unwrap();
        assert_eq!(full.input_type.as_deref(), Some("Video"));
        assert_eq!(full.target_fps, Some(10.0));

        assert!(serde_json::from_str::<StatusReport>(r#"{"input_type": "Camera"}"#).is_err());
    }

    #[test]
    fn action_reply_success_and_message() {
        let ok: ActionReply = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert!(ok.is_success());

        let err: ActionReply =
            serde_json::from_str(r#"{"status":"error","message":"camera busy"}"#).unwrap();
        assert!(!err.is_success());
        assert_eq!(err.message_or_default(), "camera busy");
    }

    #[test]
    fn form_fields_carry_input_type_value() {
        let form = FormSnapshot {
            input_type: InputType::Video,
            ..Default::default()
        };
        let fields = form.text_fields();
        assert_eq!(fields[0], ("input_type", "Video".to_string()));
        assert!(fields.iter().any(|(k, v)| *k == "target_fps" && v == "15"));
        assert!(!form.has_video_file());
    }

    #[test]
    fn empty_path_is_not_an_attached_file() {
        let form = FormSnapshot {
            video_file: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(!form.has_video_file());
    }
}
