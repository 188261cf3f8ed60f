use crate::model::{FormSnapshot, InputType, PanelView, StreamStats};
use std::path::PathBuf;

/// Editable controls of the panel form, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    InputType,
    VideoFile,
    Token,
    ChatId,
    FromTime,
    ToTime,
    PlaybackSpeed,
    TargetFps,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::InputType,
        FormField::VideoFile,
        FormField::Token,
        FormField::ChatId,
        FormField::FromTime,
        FormField::ToTime,
        FormField::PlaybackSpeed,
        FormField::TargetFps,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::InputType => "Input",
            FormField::VideoFile => "Video file",
            FormField::Token => "Bot token",
            FormField::ChatId => "Chat ID",
            FormField::FromTime => "From",
            FormField::ToTime => "To",
            FormField::PlaybackSpeed => "Playback speed",
            FormField::TargetFps => "Target FPS",
        }
    }

    /// Raw value, used to seed the edit buffer.
    pub fn value(self, form: &FormSnapshot) -> String {
        match self {
            FormField::InputType => form.input_type.as_form_value().to_string(),
            FormField::VideoFile => form
                .video_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            FormField::Token => form.token.clone(),
            FormField::ChatId => form.chat_id.clone(),
            FormField::FromTime => form.from_time.clone(),
            FormField::ToTime => form.to_time.clone(),
            FormField::PlaybackSpeed => form.playback_speed.to_string(),
            FormField::TargetFps => form.target_fps.to_string(),
        }
    }

    /// Value as drawn; secrets are masked.
    pub fn display_value(self, form: &FormSnapshot) -> String {
        match self {
            FormField::Token if !form.token.is_empty() => {
                "*".repeat(form.token.chars().count().min(12))
            }
            FormField::VideoFile if !form.has_video_file() => "(none)".to_string(),
            _ => self.value(form),
        }
    }

    /// Parse `input` into `form`; the form is untouched on error.
    pub fn apply(self, form: &mut FormSnapshot, input: &str) -> Result<(), String> {
        let input = input.trim();
        match self {
            FormField::InputType => {
                form.input_type = match input.to_ascii_lowercase().as_str() {
                    "camera" => InputType::Camera,
                    "video" => InputType::Video,
                    _ => return Err(format!("Unknown input type: {input}")),
                };
            }
            FormField::VideoFile => {
                form.video_file = (!input.is_empty()).then(|| PathBuf::from(input));
            }
            FormField::Token => form.token = input.to_string(),
            FormField::ChatId => form.chat_id = input.to_string(),
            FormField::FromTime | FormField::ToTime => {
                if !is_clock_time(input) {
                    return Err(format!("{}: expected HH:MM:SS, got {input:?}", self.label()));
                }
                if self == FormField::FromTime {
                    form.from_time = input.to_string();
                } else {
                    form.to_time = input.to_string();
                }
            }
            FormField::PlaybackSpeed | FormField::TargetFps => {
                let v: f64 = input
                    .parse()
                    .ok()
                    .filter(|v: &f64| v.is_finite() && *v > 0.0)
                    .ok_or_else(|| format!("{}: expected a positive number", self.label()))?;
                if self == FormField::PlaybackSpeed {
                    form.playback_speed = v;
                } else {
                    form.target_fps = v;
                }
            }
        }
        Ok(())
    }
}

fn is_clock_time(s: &str) -> bool {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return false;
    }
    let limits = [23u32, 59, 59];
    parts.iter().zip(limits).all(|(p, max)| {
        p.len() == 2
            && p.chars().all(|c| c.is_ascii_digit())
            && p.parse::<u32>().is_ok_and(|v| v <= max)
    })
}

/// Fields currently shown; the upload field only exists in video mode.
pub fn visible_fields(upload_visible: bool) -> Vec<FormField> {
    FormField::ALL
        .into_iter()
        .filter(|f| upload_visible || *f != FormField::VideoFile)
        .collect()
}

pub struct UiState {
    pub tab: usize,
    pub base_url: String,
    pub view: PanelView,
    pub form: FormSnapshot,
    pub selected: usize,
    pub editing: Option<String>,
    pub clock: String,
    pub stream: Option<StreamStats>,
    pub info: String,
    /// A dismissal was sent and the controller has not answered yet.
    pub dismiss_pending: bool,
}

impl UiState {
    pub fn new(form: FormSnapshot, base_url: String) -> Self {
        Self {
            tab: 0,
            base_url,
            view: PanelView::default(),
            form,
            selected: 0,
            editing: None,
            clock: String::new(),
            stream: None,
            info: String::new(),
            dismiss_pending: false,
        }
    }

    pub fn fields(&self) -> Vec<FormField> {
        visible_fields(self.view.upload_visible)
    }

    pub fn selected_field(&self) -> Option<FormField> {
        self.fields().get(self.selected).copied()
    }

    pub fn move_selection(&mut self, down: bool) {
        let n = self.fields().len();
        if n == 0 {
            return;
        }
        self.selected = if down {
            (self.selected + 1).min(n - 1)
        } else {
            self.selected.saturating_sub(1)
        };
    }

    /// Replace the panel snapshot, keeping the selection on the same field if it still exists.
    pub fn apply_view(&mut self, view: PanelView) {
        let current = self.selected_field();
        self.view = view;
        self.dismiss_pending = false;
        let fields = self.fields();
        self.selected = current
            .and_then(|f| fields.iter().position(|x| *x == f))
            .unwrap_or_else(|| self.selected.min(fields.len().saturating_sub(1)));
        if !self.view.form_enabled {
            self.editing = None;
        }
    }

    /// Stream stats are only kept for the source the panel currently shows.
    pub fn apply_stream(&mut self, stats: StreamStats) {
        if self.video_url().as_deref() == Some(stats.url.as_str()) {
            self.stream = Some(stats);
        }
    }

    pub fn video_url(&self) -> Option<String> {
        self.view
            .video_source
            .as_ref()
            .map(|src| format!("{}{}", self.base_url.trim_end_matches('/'), src))
    }

    pub fn begin_edit(&mut self) -> bool {
        if !self.view.form_enabled {
            self.info = "Form is locked while surveillance is running".into();
            return false;
        }
        match self.selected_field() {
            Some(FormField::InputType) | None => false,
            Some(field) => {
                self.editing = Some(field.value(&self.form));
                true
            }
        }
    }

    pub fn commit_edit(&mut self) {
        let (Some(buffer), Some(field)) = (self.editing.take(), self.selected_field()) else {
            return;
        };
        match field.apply(&mut self.form, &buffer) {
            Ok(()) => self.info = format!("{} updated", field.label()),
            Err(e) => self.info = e,
        }
    }
}
