use std::time::Duration;

use serde::Deserialize;

use crate::models::generation::{AiModel, GenerationDefaults};
use crate::services::poller::PollConfig;
use crate::services::stub::StubConfig;
use crate::services::transport::TransportConfig;

/// Environment-driven configuration, read from `GACHA_`-prefixed variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base URL of the generation API, including the `/api` prefix.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between status polls for one task.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Consecutive transient poll failures tolerated before giving up.
    #[serde(default = "default_max_poll_failures")]
    pub max_poll_failures: u32,

    /// Overall polling deadline, measured from submission.
    #[serde(default = "default_poll_deadline_secs")]
    pub poll_deadline_secs: u64,

    #[serde(default = "default_model")]
    pub default_model: AiModel,

    #[serde(default = "default_count")]
    pub default_count: u32,

    #[serde(default = "default_steps")]
    pub default_steps: u32,

    #[serde(default = "default_cfg_scale")]
    pub default_cfg_scale: f32,

    /// Stub server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Stub tasks report `processing` after this long.
    #[serde(default = "default_stub_processing_after_ms")]
    pub stub_processing_after_ms: u64,

    /// Stub tasks report `completed` after this long.
    #[serde(default = "default_stub_complete_after_ms")]
    pub stub_complete_after_ms: u64,

    /// Placeholder image service the stub points result URLs at.
    #[serde(default = "default_stub_image_base_url")]
    pub stub_image_base_url: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_failures() -> u32 {
    5
}

fn default_poll_deadline_secs() -> u64 {
    300
}

fn default_model() -> AiModel {
    GenerationDefaults::default().model
}

fn default_count() -> u32 {
    GenerationDefaults::default().count
}

fn default_steps() -> u32 {
    GenerationDefaults::default().steps
}

fn default_cfg_scale() -> f32 {
    GenerationDefaults::default().cfg_scale
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_stub_processing_after_ms() -> u64 {
    1500
}

fn default_stub_complete_after_ms() -> u64 {
    4000
}

fn default_stub_image_base_url() -> String {
    "https://picsum.photos/seed".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_failures: default_max_poll_failures(),
            poll_deadline_secs: default_poll_deadline_secs(),
            default_model: default_model(),
            default_count: default_count(),
            default_steps: default_steps(),
            default_cfg_scale: default_cfg_scale(),
            bind_addr: default_bind_addr(),
            stub_processing_after_ms: default_stub_processing_after_ms(),
            stub_complete_after_ms: default_stub_complete_after_ms(),
            stub_image_base_url: default_stub_image_base_url(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed("GACHA_").from_env()
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            base_url: self.api_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn polling(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_consecutive_failures: self.max_poll_failures,
            deadline: Duration::from_secs(self.poll_deadline_secs),
        }
    }

    pub fn generation_defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            model: self.default_model,
            count: self.default_count,
            steps: self.default_steps,
            cfg_scale: self.default_cfg_scale,
        }
    }

    pub fn stub(&self) -> StubConfig {
        StubConfig {
            processing_after: Duration::from_millis(self.stub_processing_after_ms),
            complete_after: Duration::from_millis(self.stub_complete_after_ms),
            image_base_url: self.stub_image_base_url.clone(),
        }
    }
}
