use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Image models the gacha form offers.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, EnumIter, Display, PartialEq, Eq, Hash,
)]
pub enum AiModel {
    #[serde(rename = "stable-diffusion-v1.5")]
    #[strum(serialize = "stable-diffusion-v1.5")]
    StableDiffusionV15,

    #[serde(rename = "stable-diffusion-v2.1")]
    #[strum(serialize = "stable-diffusion-v2.1")]
    StableDiffusionV21,

    #[serde(rename = "dall-e-3")]
    #[strum(serialize = "dall-e-3")]
    DallE3,
}

/// Image edge lengths the backend accepts.
pub const SUPPORTED_DIMENSIONS: [u32; 3] = [512, 768, 1024];

/// Parameters for one gacha spin. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct GenerationRequest {
    #[garde(length(chars, min = 1, max = 2000), custom(not_blank))]
    pub prompt: String,

    #[garde(skip)]
    pub model: AiModel,

    #[garde(range(min = 1, max = 10))]
    pub count: u32,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    #[garde(range(min = 1, max = 150))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,

    #[garde(range(min = 1.0, max = 20.0))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfg_scale: Option<f32>,

    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    #[garde(custom(supported_dimension))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[garde(custom(supported_dimension))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("prompt must not be blank"));
    }
    Ok(())
}

fn supported_dimension(value: &Option<u32>, _ctx: &()) -> garde::Result {
    match value {
        Some(px) if !SUPPORTED_DIMENSIONS.contains(px) => Err(garde::Error::new(format!(
            "{px} is not one of {SUPPORTED_DIMENSIONS:?}"
        ))),
        _ => Ok(()),
    }
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, model: AiModel, count: u32) -> Self {
        Self {
            prompt: prompt.into(),
            model,
            count,
            seed: None,
            steps: None,
            cfg_scale: None,
            negative_prompt: None,
            height: None,
            width: None,
        }
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_cfg_scale(mut self, cfg_scale: f32) -> Self {
        self.cfg_scale = Some(cfg_scale);
        self
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Form defaults used when a caller only supplies a prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub model: AiModel,
    pub count: u32,
    pub steps: u32,
    pub cfg_scale: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            model: AiModel::StableDiffusionV21,
            count: 4,
            steps: 30,
            cfg_scale: 7.5,
        }
    }
}

impl GenerationDefaults {
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest::new(prompt, self.model, self.count)
            .with_steps(self.steps)
            .with_cfg_scale(self.cfg_scale)
    }
}

/// A generated image as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageResult {
    pub id: String,
    pub task_id: String,
    pub url: String,
    pub seed: i64,
    pub created_at: DateTime<Utc>,
}
