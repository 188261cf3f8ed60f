//! Text summary builder for headless output.

use crate::model::{PanelView, StatusReport};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn button_line(name: &str, enabled: bool, label: &str) -> String {
    let state = if enabled { "enabled" } else { "disabled" };
    format!("{name}: {state} ({label})")
}

/// One-line description of the settings the server reported, if any.
pub(crate) fn describe_server(report: &StatusReport) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(input) = report.input_type.as_deref() {
        parts.push(format!("input {input}"));
    }
    if let (Some(from), Some(to)) = (report.from_time.as_deref(), report.to_time.as_deref()) {
        parts.push(format!("window {from}-{to}"));
    }
    if let Some(speed) = report.playback_speed {
        parts.push(format!("speed {speed}x"));
    }
    if let Some(fps) = report.target_fps {
        parts.push(format!("{fps} fps"));
    }
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub(crate) fn build_text_summary(view: &PanelView) -> TextSummary {
    let mut lines = vec![
        format!("Status: {} [{}]", view.status_text, view.indicator_class),
        button_line("Start", view.start_button.enabled, &view.start_button.label),
        button_line("Stop", view.stop_button.enabled, &view.stop_button.label),
    ];
    if let Some(src) = view.video_source.as_deref() {
        lines.push(format!("Video: {src}"));
    }
    if let Some(server) = view.server.as_ref().and_then(describe_server) {
        lines.push(format!("Server: {server}"));
    }
    TextSummary { lines }
}
