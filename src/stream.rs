//! Monitor for the attached video source.
//!
//! Follows whatever URL the panel currently shows, counting JPEG parts of an
//! MJPEG (`multipart/x-mixed-replace`) response, or a single frame for a plain image.

use crate::model::{PanelEvent, StreamStats};
use bytes::BytesMut;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const DEFAULT_BOUNDARY: &str = "frame";
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Extract the multipart boundary from a `Content-Type` header value.
///
/// Returns `None` when the response is not a multipart stream.
pub(crate) fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let lower = content_type.to_ascii_lowercase();
    if !lower.trim_start().starts_with("multipart/") {
        return None;
    }
    let boundary = content_type
        .split(';')
        .map(str::trim)
        .find_map(|param| {
            let (k, v) = param.split_once('=')?;
            k.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| v.trim().trim_matches('"').to_string())
        })
        .unwrap_or_else(|| DEFAULT_BOUNDARY.to_string());
    let boundary = boundary.trim_start_matches("--").to_string();
    if boundary.is_empty() {
        Some(DEFAULT_BOUNDARY.to_string())
    } else {
        Some(boundary)
    }
}

/// Counts boundary markers across arbitrarily split chunks.
pub(crate) struct FrameCounter {
    marker: Vec<u8>,
    carry: BytesMut,
    consumed: u64,
    prev_marker_end: Option<u64>,
    pub frames: u64,
    pub last_frame_bytes: Option<u64>,
}

impl FrameCounter {
    pub fn new(boundary: &str) -> Self {
        Self {
            marker: format!("--{boundary}").into_bytes(),
            carry: BytesMut::new(),
            consumed: 0,
            prev_marker_end: None,
            frames: 0,
            last_frame_bytes: None,
        }
    }

    /// Feed the next chunk; returns how many new frames started in it.
    pub fn push(&mut self, chunk: &[u8]) -> u64 {
        let mut window = std::mem::take(&mut self.carry);
        let window_start = self.consumed - window.len() as u64;
        window.extend_from_slice(chunk);
        self.consumed += chunk.len() as u64;

        let mut found = 0;
        let mut pos = 0;
        while let Some(i) = find(&window[pos..], &self.marker) {
            let at = window_start + (pos + i) as u64;
            if let Some(prev_end) = self.prev_marker_end {
                self.last_frame_bytes = Some(at - prev_end);
            }
            pos += i + self.marker.len();
            self.prev_marker_end = Some(window_start + pos as u64);
            found += 1;
        }

        let keep_from = window
            .len()
            .saturating_sub(self.marker.len() - 1)
            .max(pos);
        let _ = window.split_to(keep_from);
        self.carry = window;
        self.frames += found;
        found
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Read `url` until it ends or the task is aborted, reporting stats about once a second.
pub(crate) async fn monitor_stream(
    http: reqwest::Client,
    url: String,
    event_tx: UnboundedSender<PanelEvent>,
) {
    let mut stats = StreamStats {
        url: url.clone(),
        ..Default::default()
    };

    let resp = match http.get(&url).send().await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%url, "video source unreachable: {e}");
            stats.error = Some(e.to_string());
            let _ = event_tx.send(PanelEvent::Stream(stats));
            return;
        }
    };
    if !resp.status().is_success() {
        tracing::warn!(%url, status = %resp.status(), "video source refused");
        stats.error = Some(format!("HTTP {}", resp.status()));
        let _ = event_tx.send(PanelEvent::Stream(stats));
        return;
    }

    let boundary = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(boundary_from_content_type);

    let Some(boundary) = boundary else {
        match resp.bytes().await {
            Ok(body) => {
                stats.frames = 1;
                stats.bytes = body.len() as u64;
                stats.last_frame_bytes = Some(stats.bytes);
            }
            Err(e) => stats.error = Some(e.to_string()),
        }
        let _ = event_tx.send(PanelEvent::Stream(stats));
        return;
    };

    tracing::debug!(%url, %boundary, "following MJPEG stream");
    stats.live = true;
    let _ = event_tx.send(PanelEvent::Stream(stats.clone()));

    let mut counter = FrameCounter::new(&boundary);
    let mut body = resp.bytes_stream();
    let mut window_start = Instant::now();
    let mut window_frames = 0u64;
    // Windows close on the timer so a stalled feed drops to 0 fps.
    let mut ticker = tokio::time::interval_at(window_start + REPORT_INTERVAL, REPORT_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            chunk = body.next() => {
                let chunk = match chunk {
                    Some(Ok(b)) => b,
                    Some(Err(e)) => {
                        tracing::warn!(%url, "video stream interrupted: {e}");
                        stats.error = Some(e.to_string());
                        break;
                    }
                    None => break,
                };
                window_frames += counter.push(&chunk);
                stats.bytes += chunk.len() as u64;
                stats.frames = counter.frames;
                stats.last_frame_bytes = counter.last_frame_bytes;
            }
            _ = ticker.tick() => {
                let elapsed = window_start.elapsed().as_secs_f64();
                stats.fps = if elapsed > 0.0 { window_frames as f64 / elapsed } else { 0.0 };
                window_frames = 0;
                window_start = Instant::now();
                let _ = event_tx.send(PanelEvent::Stream(stats.clone()));
            }
        }
    }

    stats.live = false;
    stats.fps = 0.0;
    let _ = event_tx.send(PanelEvent::Stream(stats));
}

/// Keeps exactly one monitor running for the current video source.
pub(crate) struct StreamMonitor {
    http: reqwest::Client,
    base_url: String,
    event_tx: UnboundedSender<PanelEvent>,
    current: Option<(String, JoinHandle<()>)>,
}

impl StreamMonitor {
    pub fn new(
        base_url: &str,
        user_agent: &str,
        event_tx: UnboundedSender<PanelEvent>,
    ) -> anyhow::Result<Self> {
        // No overall timeout: the feed is an endless response.
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            event_tx,
            current: None,
        })
    }

    /// Restart the monitor if `source` differs from the one being followed.
    pub fn follow(&mut self, source: Option<&str>) {
        let Some(source) = source else {
            self.stop();
            return;
        };
        if self.current.as_ref().is_some_and(|(s, _)| s == source) {
            return;
        }
        self.stop();
        let url = format!("{}{}", self.base_url, source);
        let handle = tokio::spawn(monitor_stream(
            self.http.clone(),
            url,
            self.event_tx.clone(),
        ));
        self.current = Some((source.to_string(), handle));
    }

    pub fn stop(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
    }
}

impl Drop for StreamMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
