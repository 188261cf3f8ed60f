//! In-memory backend that replays queued replies and records calls.

use super::{BackendError, SurveillanceBackend};
use crate::model::{ActionReply, FormSnapshot, StatusReport};
use futures::future::{BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    statuses: Mutex<VecDeque<Result<StatusReport, BackendError>>>,
    starts: Mutex<VecDeque<Result<ActionReply, BackendError>>>,
    stops: Mutex<VecDeque<Result<ActionReply, BackendError>>>,
    calls: Mutex<Vec<&'static str>>,
    forms: Mutex<Vec<FormSnapshot>>,
}

pub(crate) fn success() -> ActionReply {
    ActionReply {
        status: "success".into(),
        message: None,
    }
}

pub(crate) fn failure(message: &str) -> ActionReply {
    ActionReply {
        status: "error".into(),
        message: Some(message.into()),
    }
}

pub(crate) fn running(is_running: bool) -> StatusReport {
    StatusReport {
        is_running,
        ..Default::default()
    }
}

/// A failure that never reached a JSON reply.
pub(crate) fn broken() -> BackendError {
    serde_json::from_str::<ActionReply>("<html>502</html>")
        .unwrap_err()
        .into()
}

impl ScriptedBackend {
    pub fn with_status(self, r: Result<StatusReport, BackendError>) -> Self {
        self.statuses.lock().unwrap().push_back(r);
        self
    }

    pub fn with_start(self, r: Result<ActionReply, BackendError>) -> Self {
        self.starts.lock().unwrap().push_back(r);
        self
    }

    pub fn with_stop(self, r: Result<ActionReply, BackendError>) -> Self {
        self.stops.lock().unwrap().push_back(r);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn forms(&self) -> Vec<FormSnapshot> {
        self.forms.lock().unwrap().clone()
    }

    fn next<T>(
        &self,
        name: &'static str,
        q: &Mutex<VecDeque<Result<T, BackendError>>>,
    ) -> Result<T, BackendError> {
        self.calls.lock().unwrap().push(name);
        q.lock().unwrap().pop_front().unwrap_or_else(|| Err(broken()))
    }
}

impl SurveillanceBackend for ScriptedBackend {
    fn status(&self) -> BoxFuture<'_, Result<StatusReport, BackendError>> {
        let r = self.next("status", &self.statuses);
        async move { r }.boxed()
    }

    fn start(&self, form: FormSnapshot) -> BoxFuture<'_, Result<ActionReply, BackendError>> {
        self.forms.lock().unwrap().push(form);
        let r = self.next("start", &self.starts);
        async move {
            tokio::task::yield_now().await;
            r
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<ActionReply, BackendError>> {
        let r = self.next("stop", &self.stops);
        async move {
            tokio::task::yield_now().await;
            r
        }
        .boxed()
    }
}
