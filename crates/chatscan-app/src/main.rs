//! chatscan application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Build the OCR pipeline (Tesseract, optional YOLO bubble detector)
//! 4. Build the LLM client shared by chat and image analysis
//! 5. Start the axum REST API server

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatscan_api::routes;
use chatscan_api::state::AppState;
use chatscan_chat::OpenAiClient;
use chatscan_core::config::ChatscanConfig;
use chatscan_ocr::{OcrPipeline, TesseractEngine, TextLineExtractor, YoloDetector};

use cli::CliArgs;

/// Build the OCR pipeline. A detector that fails to load is logged and
/// skipped; detection requests then fall back to full-image OCR.
fn build_pipeline(config: &ChatscanConfig) -> OcrPipeline {
    let engine = Arc::new(TesseractEngine::new(config.ocr.clone()));
    let pipeline = OcrPipeline::new(TextLineExtractor::new(engine, &config.ocr));

    if !config.detection.enabled {
        tracing::info!("Bubble detection disabled");
        return pipeline;
    }

    match YoloDetector::new(config.detection.clone()) {
        Ok(detector) => {
            tracing::info!(model = %config.detection.model_path, "Bubble detector loaded");
            pipeline.with_detector(Arc::new(detector))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Bubble detector unavailable, continuing without it");
            pipeline
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config (read before tracing so the configured level applies).
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = match ChatscanConfig::load(&config_file) {
        Ok(config) => (config, None),
        Err(e) => (ChatscanConfig::default(), Some(e)),
    };
    config.server.port = args.resolve_port(config.server.port);
    config.server.host = args.resolve_host(&config.server.host);
    config.logging.level = args.resolve_log_level(&config.logging.level);

    // Tracing: RUST_LOG wins over the resolved level.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting chatscan v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) if config_file.exists() => {
            tracing::warn!(path = %config_file.display(), error = %e, "Invalid config, using defaults")
        }
        Some(_) => tracing::info!(path = %config_file.display(), "No config file, using defaults"),
    }

    // OCR.
    let pipeline = build_pipeline(&config);
    tracing::info!(
        engine = pipeline.engine_name(),
        languages = ?config.ocr.languages,
        detection = pipeline.has_detector(),
        "OCR pipeline ready"
    );

    // LLM.
    let llm = OpenAiClient::from_config(&config.llm);
    if llm.has_api_key() {
        tracing::info!(model = %config.llm.model, vision_model = %config.llm.vision_model, "LLM client ready");
    } else {
        tracing::warn!(
            env = %config.llm.api_key_env,
            "No API key set; chat and image analysis will return fallback replies"
        );
    }

    // === API server ===

    let state = AppState::new(config, pipeline, Arc::new(llm));
    if let Err(e) = routes::start_server(state).await {
        tracing::error!(error = %e, "API server stopped");
        return Err(e.into());
    }

    Ok(())
}
