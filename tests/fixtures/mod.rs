//! Test fixtures: representative gacha spins and stub timings
#![allow(dead_code)]

use std::time::Duration;

use img_gacha::{
    models::generation::{AiModel, GenerationRequest},
    services::stub::StubConfig,
};

/// A stub that settles quickly but still passes through every status.
pub fn fast_stub() -> StubConfig {
    StubConfig {
        processing_after: Duration::from_millis(40),
        complete_after: Duration::from_millis(120),
        image_base_url: "https://img.test/seed".to_string(),
    }
}

/// Test fixture describing one spin and what it should yield
#[derive(Debug, Clone)]
pub struct SpinFixture {
    pub prompt: &'static str,
    pub model: AiModel,
    pub count: u32,
    pub seed: Option<i64>,
    pub description: &'static str,
}

impl SpinFixture {
    pub fn request(&self) -> GenerationRequest {
        let request = GenerationRequest::new(self.prompt, self.model, self.count);
        match self.seed {
            Some(seed) => request.with_seed(seed),
            None => request,
        }
    }
}

pub const SPIN_FIXTURES: &[SpinFixture] = &[
    SpinFixture {
        prompt: "a shiba inu astronaut floating above Kyoto",
        model: AiModel::StableDiffusionV21,
        count: 4,
        seed: Some(1000),
        description: "form defaults, fixed seed",
    },
    SpinFixture {
        prompt: "watercolor koi pond at dusk",
        model: AiModel::StableDiffusionV15,
        count: 1,
        seed: None,
        description: "single image, random seed",
    },
    SpinFixture {
        prompt: "a maneki-neko made of stained glass",
        model: AiModel::DallE3,
        count: 10,
        seed: Some(-5),
        description: "maximum batch, negative seed",
    },
];
