//! HTTP delivery worker: ships captured events to the backend aggregator.
//!
//! One task, consuming a channel the scheduler publishes onto. Delivery is
//! best-effort: a failed send is logged and reflected in `AppHealth`, but
//! the event is not retried or persisted, matching the reference agent's
//! fire-and-forget `request_sender_worker`.

use std::sync::Arc;
use std::time::Duration;

use image::ImageEncoder;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::config::UserConfig;
use crate::models::{AfkStart, AppHealth, CaptureEvent, CapturedImage, DeliveryStatus, DesktopCheck, DesktopCheckMetadata};
use crate::utils::memory::PooledBuffer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SCREENSHOT_ENDPOINT: &str = "sources/aggregator/desktop/screenshot-input";
const AFK_ENDPOINT: &str = "sources/aggregator/desktop/afk-input";
/// Reused PNG-encode buffers are capped at this count, matching the
/// reference agent's single reused `io.BytesIO` handle with a little slack
/// for overlapping in-flight encodes.
const PNG_BUFFER_POOL_SIZE: usize = 4;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("PNG encode failed: {0}")]
    Encode(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Joins `backend_url` with a relative `endpoint`, treating the base as a
/// directory regardless of whether it already ends in `/`.
pub(crate) fn join_url(backend_url: &str, endpoint: &str) -> Result<url::Url, DispatchError> {
    let mut base = url::Url::parse(backend_url).map_err(|e| DispatchError::InvalidUrl(e.to_string()))?;
    if !base.path().ends_with('/') {
        let mut path = base.path().to_string();
        path.push('/');
        base.set_path(&path);
    }
    base.join(endpoint).map_err(|e| DispatchError::InvalidUrl(e.to_string()))
}

/// Encodes `image` as PNG into `buf`, reusing its allocation.
fn encode_png(image: &CapturedImage, buf: &mut Vec<u8>) -> Result<(), DispatchError> {
    buf.clear();
    let encoder = image::codecs::png::PngEncoder::new(&mut *buf);
    encoder
        .write_image(&image.rgb, image.width, image.height, image::ExtendedColorType::Rgb8)
        .map_err(|e| DispatchError::Encode(e.to_string()))?;
    Ok(())
}

pub struct Dispatcher {
    config: Arc<RwLock<UserConfig>>,
    health: Arc<RwLock<AppHealth>>,
    client: Client,
    events: mpsc::Receiver<CaptureEvent>,
    png_buffer_pool: PooledBuffer<u8>,
}

impl Dispatcher {
    pub fn new(
        config: Arc<RwLock<UserConfig>>,
        health: Arc<RwLock<AppHealth>>,
        events: mpsc::Receiver<CaptureEvent>,
    ) -> Self {
        Self {
            config,
            health,
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
            events,
            png_buffer_pool: PooledBuffer::new(PNG_BUFFER_POOL_SIZE),
        }
    }

    /// Runs forever, draining the event channel; returns once the
    /// scheduler drops its sender.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            if !self.config.read().await.is_paired() {
                tracing::debug!("dropping capture event, not paired");
                continue;
            }

            let result = match &event {
                CaptureEvent::DesktopCheck(check) => self.send_desktop_check(check).await,
                CaptureEvent::AfkStart(afk) => self.send_afk_start(afk).await,
            };

            let status = match result {
                Ok(()) => DeliveryStatus::Success,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to deliver capture event");
                    DeliveryStatus::Fail
                }
            };
            self.health.write().await.record_data_sent(status);
        }
    }

    async fn backend_credentials(&self) -> (String, String) {
        let config = self.config.read().await;
        (config.backend_url.clone(), config.device_token.clone())
    }

    async fn send_desktop_check(&mut self, check: &DesktopCheck) -> Result<(), DispatchError> {
        let (backend_url, device_token) = self.backend_credentials().await;
        let url = join_url(&backend_url, SCREENSHOT_ENDPOINT)?;

        let mut buf = self.png_buffer_pool.acquire();
        let encode_result = encode_png(&check.screenshot, &mut buf);
        let png_bytes = buf.clone();
        self.png_buffer_pool.release(buf);
        encode_result?;

        let metadata = DesktopCheckMetadata::from(check);
        let metadata_json = serde_json::to_string(&metadata)?;

        let part = reqwest::multipart::Part::bytes(png_bytes)
            .file_name("screenshot.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new().text("data", metadata_json).part("screenshot", part);

        let response = self.client.post(url).bearer_auth(device_token).multipart(form).send().await?;
        response.error_for_status()?;
        Ok(())
    }

    async fn send_afk_start(&self, afk: &AfkStart) -> Result<(), DispatchError> {
        let (backend_url, device_token) = self.backend_credentials().await;
        let url = join_url(&backend_url, AFK_ENDPOINT)?;

        let response = self.client.post(url).bearer_auth(device_token).json(afk).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}
