use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use leafscan::artifact_manager::{ArtifactManager, ArtifactSource, RemoteFile};
use leafscan::assistant::{AssistantClient, AssistantConfig};
use leafscan::server::config::DEFAULT_MAX_UPLOAD_BYTES;
use leafscan::server::{self, AppState, ServerConfig};
use leafscan::{Classifier, OptimizationLevel, RuntimeConfig, DEFAULT_INPUT_SIZE};

/// Plant-disease classification server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "LEAFSCAN_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "LEAFSCAN_PORT", default_value_t = 8000)]
    port: u16,

    /// Directory holding cached artifacts
    #[arg(long, env = "LEAFSCAN_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// Path to the ONNX classifier (defaults to <artifacts dir>/model.onnx)
    #[arg(long, env = "LEAFSCAN_MODEL")]
    model: Option<PathBuf>,

    /// Path to the label file (defaults to <artifacts dir>/class_names.txt)
    #[arg(long, env = "LEAFSCAN_LABELS")]
    labels: Option<PathBuf>,

    /// URL to fetch the classifier from when it is not cached
    #[arg(long, env = "LEAFSCAN_MODEL_URL")]
    model_url: Option<String>,

    /// Expected SHA-256 of the downloaded classifier
    #[arg(long, env = "LEAFSCAN_MODEL_SHA256", requires = "model_url")]
    model_sha256: Option<String>,

    /// URL to fetch the label file from when it is not cached
    #[arg(long, env = "LEAFSCAN_LABELS_URL")]
    labels_url: Option<String>,

    /// Expected SHA-256 of the downloaded label file
    #[arg(long, env = "LEAFSCAN_LABELS_SHA256", requires = "labels_url")]
    labels_sha256: Option<String>,

    /// Force a fresh download of the artifact files
    #[arg(short, long)]
    fresh: bool,

    /// Model input resolution (square)
    #[arg(long, env = "LEAFSCAN_INPUT_SIZE", default_value_t = DEFAULT_INPUT_SIZE)]
    input_size: u32,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "LEAFSCAN_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    intra_threads: usize,

    /// ONNX Runtime inter-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    inter_threads: usize,

    /// ONNX Runtime graph optimization level
    #[arg(long, value_enum, default_value_t = OptimizationLevel::All)]
    optimization_level: OptimizationLevel,

    /// Base URL of an OpenAI-compatible text-generation API
    #[arg(long, env = "LEAFSCAN_LLM_URL")]
    llm_url: Option<String>,

    /// API key for the text-generation API
    #[arg(long, env = "LEAFSCAN_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Model name sent to the text-generation API
    #[arg(long, env = "LEAFSCAN_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,
}

impl Args {
    fn artifact_source(&self) -> ArtifactSource {
        ArtifactSource {
            model: self.model_url.as_ref().map(|url| RemoteFile {
                url: url.clone(),
                sha256: self.model_sha256.clone(),
            }),
            labels: self.labels_url.as_ref().map(|url| RemoteFile {
                url: url.clone(),
                sha256: self.labels_sha256.clone(),
            }),
        }
    }
}

async fn ensure_artifacts(manager: &ArtifactManager, args: &Args) -> anyhow::Result<()> {
    if args.fresh {
        info!("Fresh download requested - removing any cached artifacts...");
        manager.remove_download()?;
    }

    let source = args.artifact_source();
    if !source.is_empty() {
        manager
            .download(&source)
            .await
            .context("failed to download classifier artifacts")?;
    }
    Ok(())
}

fn build_assistant(args: &Args) -> anyhow::Result<Option<AssistantClient>> {
    let Some(url) = &args.llm_url else {
        warn!("No text-generation API configured; /suggestion and /chat will answer 503");
        return Ok(None);
    };

    let mut config = AssistantConfig::new(url.clone(), args.llm_model.clone());
    if let Some(key) = &args.llm_api_key {
        config = config.with_api_key(key.clone());
    }
    info!("Text-generation API: {} (model {})", config.base_url, config.model);
    Ok(Some(AssistantClient::new(config)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    leafscan::init_logger();

    info!("=== Starting leafscan v{} ===", env!("CARGO_PKG_VERSION"));

    let manager = match &args.artifacts_dir {
        Some(dir) => ArtifactManager::new(dir),
        None => ArtifactManager::new_default(),
    }
    .context("failed to prepare artifacts directory")?;
    ensure_artifacts(&manager, &args).await?;

    let model_path = args.model.clone().unwrap_or_else(|| manager.get_model_path());
    let labels_path = args.labels.clone().unwrap_or_else(|| manager.get_labels_path());
    info!("Configuration:");
    info!("  Model path:  {:?}", model_path);
    info!("  Labels path: {:?}", labels_path);
    info!("  Input size:  {}x{}", args.input_size, args.input_size);

    let start_time = Instant::now();
    let runtime_config = RuntimeConfig {
        inter_threads: args.inter_threads,
        intra_threads: args.intra_threads,
        optimization_level: args.optimization_level,
    };
    let classifier = Classifier::builder()
        .with_runtime_config(runtime_config)
        .with_input_size(args.input_size, args.input_size)
        .with_artifact(&model_path)?
        .with_label_file(&labels_path)?
        .build()
        .context("classifier failed startup validation")?;
    info!("=== Classifier Built Successfully (took {:.2?}) ===", start_time.elapsed());

    let assistant = build_assistant(&args)?;
    let state = Arc::new(AppState::new(Arc::new(classifier), assistant));
    let config = ServerConfig {
        host: args.host.clone(),
        port: args.port,
        max_upload_bytes: args.max_upload_bytes,
    };

    server::serve(state, &config).await
}
