use std::process::ExitCode;

use clap::Parser;
use img_gacha::{
    config::AppConfig,
    models::generation::{AiModel, GenerationDefaults, GenerationRequest},
    services::{aggregator::GenerationError, client::GachaClient},
};
use tracing_subscriber::EnvFilter;

/// Spin the image gacha once and print the resulting image URLs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Prompt describing the images
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,

    /// Model to generate with (defaults to GACHA_DEFAULT_MODEL)
    #[arg(short, long)]
    model: Option<AiModel>,

    /// Number of images, 1 to 10
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Base seed; image i uses seed + i
    #[arg(short, long, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// What the images should avoid
    #[arg(long)]
    negative_prompt: Option<String>,
}

impl Cli {
    fn request(&self, defaults: GenerationDefaults) -> GenerationRequest {
        let mut request = defaults.request(self.prompt.join(" "));
        if let Some(model) = self.model {
            request.model = model;
        }
        if let Some(count) = self.count {
            request.count = count;
        }
        if let Some(seed) = self.seed {
            request = request.with_seed(seed);
        }
        if let Some(negative) = &self.negative_prompt {
            request = request.with_negative_prompt(negative.clone());
        }
        request
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::from(2);
        }
    };

    let client = match GachaClient::new(&config.transport(), config.polling()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };

    match client.health().await {
        Ok(health) => tracing::info!(status = %health.status, api = %config.api_base_url, "Generation API reachable"),
        Err(e) => tracing::warn!(error = %e, api = %config.api_base_url, "Health check failed, trying anyway"),
    }
    if let Ok(models) = client.models().await {
        tracing::info!(models = ?models, "Available models");
    }

    let request = cli.request(config.generation_defaults());
    let handle = match client.start(request) {
        Ok(handle) => handle,
        Err(report) => {
            eprintln!("invalid request: {report}");
            return ExitCode::from(2);
        }
    };

    let cancel = handle.cancel_token();
    let mut progress = handle.progress();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            tracing::info!(
                phase = %p.phase,
                task_id = p.task_id.as_deref().unwrap_or("-"),
                status = ?p.status,
                polls = p.polls,
                "Progress"
            );
            if p.phase.is_terminal() {
                break;
            }
        }
    });

    let outcome = tokio::select! {
        outcome = handle.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            None
        }
    };
    watcher.abort();

    match outcome {
        Some(Ok(images)) => {
            for image in images {
                println!("{}\tseed={}", image.url, image.seed);
            }
            ExitCode::SUCCESS
        }
        Some(Err(GenerationError::Failed(message))) => {
            eprintln!("generation failed: {message}");
            ExitCode::FAILURE
        }
        Some(Err(e)) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
        None => {
            eprintln!("cancelled");
            ExitCode::from(130)
        }
    }
}
