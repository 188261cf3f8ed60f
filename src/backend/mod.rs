mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpBackend;

use crate::model::{ActionReply, FormSnapshot, StatusReport};
use futures::future::BoxFuture;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read video file {}: {source}", path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The three operations the panel drives on the surveillance service.
///
/// Each call is a single attempt; callers decide how failures surface.
pub trait SurveillanceBackend: Send + Sync {
    fn status(&self) -> BoxFuture<'_, Result<StatusReport, BackendError>>;

    fn start(&self, form: FormSnapshot) -> BoxFuture<'_, Result<ActionReply, BackendError>>;

    fn stop(&self) -> BoxFuture<'_, Result<ActionReply, BackendError>>;
}
