//! Panel command loop.
//!
//! A single task owns the `ControlPanel` and handles commands in arrival order, so a
//! start and a stop can never be in flight at the same time. After every command the
//! stream monitor is pointed at whatever video source the panel now shows.

use crate::backend::SurveillanceBackend;
use crate::model::PanelCommand;
use crate::panel::ControlPanel;
use crate::stream::StreamMonitor;
use tokio::sync::mpsc::UnboundedReceiver;

pub(crate) async fn run_controller<B: SurveillanceBackend>(
    mut panel: ControlPanel<B>,
    mut monitor: Option<StreamMonitor>,
    check_on_launch: bool,
    mut cmd_rx: UnboundedReceiver<PanelCommand>,
) -> ControlPanel<B> {
    if check_on_launch {
        panel.check_status().await;
        follow(&mut monitor, &panel);
    }

    while let Some(cmd) = cmd_rx.recv().await {
        tracing::debug!(command = cmd.name(), "panel command");
        match cmd {
            PanelCommand::SelectInputType(t) => panel.toggle_input_type_view(t),
            PanelCommand::Start(form) => panel.start(*form).await,
            PanelCommand::Stop => panel.stop().await,
            PanelCommand::DismissAlert => panel.dismiss_alert(),
            PanelCommand::Quit => break,
        }
        follow(&mut monitor, &panel);
    }

    if let Some(m) = monitor.as_mut() {
        m.stop();
    }
    panel
}

fn follow<B: SurveillanceBackend>(monitor: &mut Option<StreamMonitor>, panel: &ControlPanel<B>) {
    if let Some(m) = monitor.as_mut() {
        m.follow(panel.view().video_source.as_deref());
    }
}
