use super::{BackendError, SurveillanceBackend};
use crate::model::{ActionReply, FormSnapshot, StatusReport};
use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// `SurveillanceBackend` over the service's HTTP endpoints.
#[derive(Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(base_url: &str, timeout: Option<Duration>, user_agent: &str) -> Result<Self> {
        reqwest::Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;

        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an absolute path (as the panel stores it) against the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn multipart(form: &FormSnapshot) -> Result<Form, BackendError> {
        let mut multipart = Form::new();
        for (name, value) in form.text_fields() {
            multipart = multipart.text(name, value);
        }

        if let Some(path) = form.video_file.as_ref().filter(|_| form.has_video_file()) {
            let data = tokio::fs::read(path)
                .await
                .map_err(|source| BackendError::Upload {
                    path: path.clone(),
                    source,
                })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "upload".to_string());
            multipart = multipart.part("video_file", Part::bytes(data).file_name(file_name));
        }
        Ok(multipart)
    }
}

/// The service answers with JSON regardless of HTTP status, so the body decides.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;
    tracing::debug!(%status, bytes = body.len(), "backend response");
    Ok(serde_json::from_str(&body)?)
}

impl SurveillanceBackend for HttpBackend {
    fn status(&self) -> BoxFuture<'_, Result<StatusReport, BackendError>> {
        async move {
            let resp = self.http.get(self.url_for("/status")).send().await?;
            read_json(resp).await
        }
        .boxed()
    }

    fn start(&self, form: FormSnapshot) -> BoxFuture<'_, Result<ActionReply, BackendError>> {
        async move {
            let multipart = Self::multipart(&form).await?;
            let resp = self
                .http
                .post(self.url_for("/start_surveillance"))
                .multipart(multipart)
                .send()
                .await?;
            read_json(resp).await
        }
        .boxed()
    }

    fn stop(&self) -> BoxFuture<'_, Result<ActionReply, BackendError>> {
        async move {
            let resp = self
                .http
                .post(self.url_for("/stop_surveillance"))
                .send()
                .await?;
            read_json(resp).await
        }
        .boxed()
    }
}
