//! Panel controller.
//!
//! Binds the three backend operations to a `PanelView` and keeps the view consistent
//! with what the server last reported. The view is only moved to Running/Stopped after
//! a response resolves; the busy labels shown while a request is in flight are cosmetic.

mod cache_buster;

pub use cache_buster::CacheBuster;

use crate::backend::SurveillanceBackend;
use crate::model::{
    ButtonView, FormSnapshot, InputType, PanelEvent, PanelView, RunningState, PLACEHOLDER_PATH,
    STARTING_LABEL, START_LABEL, STOPPING_LABEL, STOP_LABEL, VIDEO_FEED_PATH,
};
use tokio::sync::mpsc::UnboundedSender;

pub const MISSING_VIDEO_ALERT: &str = "Please upload a video file.";
pub const START_ERROR_ALERT: &str = "An error occurred while starting surveillance.";
pub const STOP_ERROR_ALERT: &str = "An error occurred while stopping surveillance.";

pub struct ControlPanel<B> {
    backend: B,
    view: PanelView,
    cache_buster: CacheBuster,
    events: Option<UnboundedSender<PanelEvent>>,
}

impl<B: SurveillanceBackend> ControlPanel<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            view: PanelView::default(),
            cache_buster: CacheBuster::default(),
            events: None,
        }
    }

    /// Publish a view snapshot on `tx` after every change.
    pub fn with_events(mut self, tx: UnboundedSender<PanelEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn view(&self) -> &PanelView {
        &self.view
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn publish(&self) {
        if let Some(tx) = self.events.as_ref() {
            let _ = tx.send(PanelEvent::View(Box::new(self.view.clone())));
        }
    }

    fn alert(&mut self, message: String) {
        self.view.alerts.push(message);
    }

    /// Drop the oldest alert once the user has acknowledged it.
    pub fn dismiss_alert(&mut self) {
        if !self.view.alerts.is_empty() {
            self.view.alerts.remove(0);
            self.publish();
        }
    }

    pub fn toggle_input_type_view(&mut self, selected: InputType) {
        self.view.upload_visible = selected == InputType::Video;
        self.publish();
    }

    fn attach_feed(&mut self) {
        self.view.video_source = Some(self.cache_buster.bust(VIDEO_FEED_PATH));
    }

    pub fn update_ui_for_running(&mut self) {
        self.apply_state(RunningState::Running);
    }

    pub fn update_ui_for_stopped(&mut self) {
        self.apply_state(RunningState::Stopped);
        self.view.video_source = Some(self.cache_buster.bust(PLACEHOLDER_PATH));
    }

    fn apply_state(&mut self, state: RunningState) {
        let running = state == RunningState::Running;
        self.view.state = state;
        self.view.start_button = ButtonView::new(!running, START_LABEL);
        self.view.stop_button = ButtonView::new(running, STOP_LABEL);
        self.view.indicator_class = state.indicator_class().to_string();
        self.view.status_text = state.status_text().to_string();
        self.view.form_enabled = !running;
    }

    /// Mirror the server-reported session state. Failures are logged only.
    pub async fn check_status(&mut self) {
        match self.backend.status().await {
            Ok(report) => {
                tracing::debug!(is_running = report.is_running, "status check");
                if report.is_running {
                    self.update_ui_for_running();
                    self.attach_feed();
                } else {
                    self.update_ui_for_stopped();
                }
                self.view.server = Some(report);
                self.publish();
            }
            Err(e) => {
                tracing::warn!("Error checking status: {e}");
            }
        }
    }

    pub async fn start(&mut self, form: FormSnapshot) {
        if !self.view.start_button.enabled {
            tracing::debug!("start ignored: control disabled");
            return;
        }
        if form.input_type == InputType::Video && !form.has_video_file() {
            self.alert(MISSING_VIDEO_ALERT.to_string());
            self.publish();
            return;
        }

        self.view.start_button = ButtonView::new(false, STARTING_LABEL);
        self.publish();

        match self.backend.start(form).await {
            Ok(reply) if reply.is_success() => {
                tracing::info!("surveillance started");
                self.update_ui_for_running();
                self.attach_feed();
            }
            Ok(reply) => {
                tracing::warn!(message = ?reply.message, "start rejected by server");
                self.alert(format!(
                    "Failed to start surveillance: {}",
                    reply.message_or_default()
                ));
                self.view.start_button = ButtonView::new(true, START_LABEL);
            }
            Err(e) => {
                tracing::error!("Error: {e}");
                self.alert(START_ERROR_ALERT.to_string());
                self.view.start_button = ButtonView::new(true, START_LABEL);
            }
        }
        self.publish();
    }

    pub async fn stop(&mut self) {
        if !self.view.stop_button.enabled {
            tracing::debug!("stop ignored: control disabled");
            return;
        }

        self.view.stop_button = ButtonView::new(false, STOPPING_LABEL);
        self.publish();

        match self.backend.stop().await {
            Ok(reply) if reply.is_success() => {
                tracing::info!("surveillance stopped");
                self.update_ui_for_stopped();
            }
            Ok(reply) => {
                tracing::warn!(message = ?reply.message, "stop rejected by server");
                self.alert(format!(
                    "Failed to stop surveillance: {}",
                    reply.message_or_default()
                ));
                self.view.stop_button = ButtonView::new(true, STOP_LABEL);
            }
            Err(e) => {
                tracing::error!("Error: {e}");
                self.alert(STOP_ERROR_ALERT.to_string());
                self.view.stop_button = ButtonView::new(true, STOP_LABEL);
            }
        }
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::scripted::{broken, failure, running, success, ScriptedBackend};

    fn video_form(file: Option<&str>) -> FormSnapshot {
        FormSnapshot {
            input_type: InputType::Video,
            video_file: file.map(Into::into),
            ..Default::default()
        }
    }

    async fn running_panel(backend: ScriptedBackend) -> ControlPanel<ScriptedBackend> {
        let mut panel = ControlPanel::new(backend.with_status(Ok(running(true))));
        panel.check_status().await;
        assert_eq!(panel.view().state, RunningState::Running);
        panel
    }

    fn assert_running(v: &PanelView) {
        assert_eq!(v.state, RunningState::Running);
        assert!(!v.start_button.enabled);
        assert!(v.stop_button.enabled);
        assert_eq!(v.indicator_class, "online");
        assert_eq!(v.status_text, "Online");
        assert!(!v.form_enabled);
        let src = v.video_source.as_deref().unwrap();
        assert!(src.starts_with("/video_feed?"));
        assert!(src["/video_feed?".len()..].parse::<u64>().is_ok());
    }

    fn assert_stopped(v: &PanelView) {
        assert_eq!(v.state, RunningState::Stopped);
        assert!(v.start_button.enabled);
        assert!(!v.stop_button.enabled);
        assert_eq!(v.indicator_class, "offline");
        assert_eq!(v.status_text, "Offline");
        assert!(v.form_enabled);
        let src = v.video_source.as_deref().unwrap();
        assert!(src.starts_with("/static/img/placeholder.jpg?"));
    }

    #[test]
    fn video_mode_shows_upload_field() {
        let mut panel = ControlPanel::new(ScriptedBackend::default());
        panel.toggle_input_type_view(InputType::Video);
        assert!(panel.view().upload_visible);
        panel.toggle_input_type_view(InputType::Camera);
        assert!(!panel.view().upload_visible);
        panel.toggle_input_type_view(InputType::Camera);
        assert!(!panel.view().upload_visible);
        assert!(panel.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn video_without_file_never_sends_request() {
        let mut panel = ControlPanel::new(ScriptedBackend::default());
        panel.start(video_form(None)).await;
        panel.start(video_form(Some(""))).await;

        assert!(panel.backend().calls().is_empty());
        assert_eq!(
            panel.view().alerts,
            vec![MISSING_VIDEO_ALERT.to_string(), MISSING_VIDEO_ALERT.to_string()]
        );
        assert!(panel.view().start_button.enabled);
        assert_eq!(panel.view().start_button.label, START_LABEL);
    }

    #[tokio::test]
    async fn successful_start_goes_online() {
        let mut panel = ControlPanel::new(ScriptedBackend::default().with_start(Ok(success())));
        let form = video_form(Some("/tmp/lobby.mp4"));
        panel.start(form.clone()).await;

        assert_running(panel.view());
        assert!(panel.view().alerts.is_empty());
        assert_eq!(panel.backend().forms(), vec![form]);
    }

    #[tokio::test]
    async fn successful_stop_goes_offline_with_placeholder() {
        let mut panel = running_panel(ScriptedBackend::default().with_stop(Ok(success()))).await;
        let feed = panel.view().video_source.clone();
        panel.stop().await;

        assert_stopped(panel.view());
        assert_ne!(panel.view().video_source, feed);
        assert_eq!(panel.backend().calls(), vec!["status", "stop"]);
    }

    #[tokio::test]
    async fn rejected_start_restores_button_and_indicator() {
        let mut panel = ControlPanel::new(
            ScriptedBackend::default().with_start(Ok(failure("no camera attached"))),
        );
        let before = panel.view().clone();
        panel.start(FormSnapshot::default()).await;

        let v = panel.view();
        assert_eq!(
            v.alerts,
            vec!["Failed to start surveillance: no camera attached".to_string()]
        );
        assert!(v.start_button.enabled);
        assert_eq!(v.start_button.label, START_LABEL);
        assert_eq!(v.indicator_class, before.indicator_class);
        assert_eq!(v.status_text, before.status_text);
        assert_eq!(v.state, RunningState::Stopped);
    }

    #[tokio::test]
    async fn rejected_stop_keeps_running() {
        let mut panel =
            running_panel(ScriptedBackend::default().with_stop(Ok(failure("camera busy")))).await;
        let feed = panel.view().video_source.clone();
        panel.stop().await;

        let v = panel.view();
        assert_eq!(v.alerts.len(), 1);
        assert!(v.alerts[0].contains("camera busy"));
        assert!(v.stop_button.enabled);
        assert_eq!(v.stop_button.label, STOP_LABEL);
        assert_eq!(v.indicator_class, "online");
        assert_eq!(v.status_text, "Online");
        assert_eq!(v.video_source, feed);
    }

    #[tokio::test]
    async fn transport_failure_uses_generic_alert() {
        let mut panel = ControlPanel::new(ScriptedBackend::default().with_start(Err(broken())));
        panel.start(FormSnapshot::default()).await;
        assert_eq!(panel.view().alerts, vec![START_ERROR_ALERT.to_string()]);
        assert!(panel.view().start_button.enabled);
        assert_eq!(panel.view().state, RunningState::Stopped);

        let mut panel = running_panel(ScriptedBackend::default().with_stop(Err(broken()))).await;
        panel.stop().await;
        assert_eq!(panel.view().alerts, vec![STOP_ERROR_ALERT.to_string()]);
        assert!(panel.view().stop_button.enabled);
        assert_eq!(panel.view().state, RunningState::Running);
    }

    #[tokio::test]
    async fn status_check_matches_start_and_stop_outcomes() {
        let mut checked =
            ControlPanel::new(ScriptedBackend::default().with_status(Ok(running(true))));
        checked.check_status().await;
        let mut started = ControlPanel::new(ScriptedBackend::default().with_start(Ok(success())));
        started.start(FormSnapshot::default()).await;
        assert_running(checked.view());
        assert_running(started.view());

        let mut checked =
            ControlPanel::new(ScriptedBackend::default().with_status(Ok(running(false))));
        checked.check_status().await;
        let mut stopped = running_panel(ScriptedBackend::default().with_stop(Ok(success()))).await;
        stopped.stop().await;
        assert_stopped(checked.view());
        assert_stopped(stopped.view());
    }

    #[tokio::test]
    async fn status_failure_is_silent() {
        let mut panel = ControlPanel::new(ScriptedBackend::default().with_status(Err(broken())));
        panel.check_status().await;
        assert_eq!(panel.view(), &PanelView::default());
    }

    #[tokio::test]
    async fn status_report_is_kept_for_display() {
        let report = crate::model::StatusReport {
            is_running: false,
            input_type: Some("Video".into()),
            target_fps: Some(10.0),
            ..Default::default()
        };
        let mut panel =
            ControlPanel::new(ScriptedBackend::default().with_status(Ok(report.clone())));
        panel.check_status().await;
        assert_eq!(panel.view().server.as_ref(), Some(&report));
    }

    #[tokio::test]
    async fn disabled_controls_swallow_commands() {
        let mut panel = running_panel(ScriptedBackend::default()).await;
        panel.start(FormSnapshot::default()).await;
        assert_eq!(panel.backend().calls(), vec!["status"]);

        let mut panel = ControlPanel::new(ScriptedBackend::default());
        panel.stop().await;
        assert!(panel.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn busy_label_is_published_before_request_resolves() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut panel =
            ControlPanel::new(ScriptedBackend::default().with_start(Ok(success()))).with_events(tx);
        panel.start(FormSnapshot::default()).await;

        let mut views = Vec::new();
        while let Ok(PanelEvent::View(v)) = rx.try_recv() {
            views.push(*v);
        }
        assert_eq!(views.len(), 2);
        assert!(!views[0].start_button.enabled);
        assert_eq!(views[0].start_button.label, STARTING_LABEL);
        assert_eq!(views[0].state, RunningState::Stopped);
        assert_running(&views[1]);
    }

    #[tokio::test]
    async fn alerts_are_dismissed_oldest_first() {
        let mut panel = ControlPanel::new(ScriptedBackend::default().with_start(Ok(failure("x"))));
        panel.start(video_form(None)).await;
        panel.start(FormSnapshot::default()).await;
        assert_eq!(panel.view().alerts.len(), 2);

        panel.dismiss_alert();
        assert_eq!(panel.view().alerts, vec!["Failed to start surveillance: x".to_string()]);
        panel.dismiss_alert();
        panel.dismiss_alert();
        assert!(panel.view().alerts.is_empty());
    }

    #[test]
    fn appliers_are_idempotent() {
        let mut panel = ControlPanel::new(ScriptedBackend::default());
        panel.update_ui_for_running();
        let once = panel.view().clone();
        panel.update_ui_for_running();
        assert_eq!(panel.view(), &once);

        panel.update_ui_for_stopped();
        let mut once = panel.view().clone();
        panel.update_ui_for_stopped();
        // Only the cache-busting stamp moves.
        once.video_source = panel.view().video_source.clone();
        assert_eq!(panel.view(), &once);
    }
}
