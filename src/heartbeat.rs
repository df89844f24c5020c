//! Periodic liveness ping to the backend, independent of capture activity.
//!
//! Mirrors the reference agent's `heartbeat_sender_worker`: while paired,
//! PUTs an empty body to the heartbeats endpoint on a jittered 30-60s
//! cadence; the jitter (rather than a fixed interval) avoids every paired
//! device hammering the backend in lockstep.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use tokio::sync::RwLock;

use crate::config::UserConfig;
use crate::models::{AppHealth, DeliveryStatus};

const MIN_INTERVAL_SECS: u64 = 30;
const MAX_INTERVAL_SECS: u64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const HEARTBEAT_ENDPOINT: &str = "sources/source-heartbeats";

fn jittered_interval() -> Duration {
    Duration::from_secs(rand::thread_rng().gen_range(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS))
}

pub struct HeartbeatPinger {
    config: Arc<RwLock<UserConfig>>,
    health: Arc<RwLock<AppHealth>>,
    client: Client,
}

impl HeartbeatPinger {
    pub fn new(config: Arc<RwLock<UserConfig>>, health: Arc<RwLock<AppHealth>>) -> Self {
        Self {
            config,
            health,
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builds with static config"),
        }
    }

    /// Runs forever; intended to be spawned as its own task.
    pub async fn run(self) {
        loop {
            if self.config.read().await.is_paired() {
                let status = match self.send_heartbeat().await {
                    Ok(()) => DeliveryStatus::Success,
                    Err(e) => {
                        tracing::warn!(error = %e, "heartbeat failed");
                        DeliveryStatus::Fail
                    }
                };
                self.health.write().await.record_heartbeat(status);
            }
            tokio::time::sleep(jittered_interval()).await;
        }
    }

    async fn send_heartbeat(&self) -> Result<(), crate::dispatcher::DispatchError> {
        let (backend_url, device_token) = {
            let config = self.config.read().await;
            (config.backend_url.clone(), config.device_token.clone())
        };
        let url = crate::dispatcher::join_url(&backend_url, HEARTBEAT_ENDPOINT)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(device_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        response.error_for_status()?;
        Ok(())
    }
}
