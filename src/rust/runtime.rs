use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::sync::OnceLock;

use crate::classifier::ClassifierError;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// How aggressively ONNX Runtime rewrites the classifier graph before running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OptimizationLevel {
    /// Run the graph exactly as exported
    Disable,
    /// Constant folding and redundant node removal
    Basic,
    /// Basic plus node fusions
    Extended,
    /// Every available optimization, including layout changes
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// Execution settings for the session that hosts the classifier artifact.
///
/// A thread count of 0 leaves the choice to ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub inter_threads: usize,
    pub intra_threads: usize,
    pub optimization_level: OptimizationLevel,
}

/// Commits the process-wide ONNX Runtime environment exactly once.
///
/// A failed first attempt is remembered, so every later caller sees the same error.
pub fn ensure_initialized() -> Result<(), ClassifierError> {
    let outcome = INIT.get_or_init(|| {
        ort::init()
            .with_name("leafscan")
            .commit()
            .map(|_| ())
            .map_err(|e| e.to_string())
    });
    outcome.clone().map_err(|msg| {
        ClassifierError::ArtifactLoadError(format!("Failed to initialize ONNX Runtime: {}", msg))
    })
}

/// Opens a session builder configured from `config`, initializing the runtime if needed.
pub fn create_session_builder(config: &RuntimeConfig) -> Result<SessionBuilder, ClassifierError> {
    ensure_initialized()?;

    let mut builder =
        Session::builder()?.with_optimization_level(config.optimization_level.into())?;
    if config.inter_threads > 0 {
        builder = builder.with_inter_threads(config.inter_threads)?;
    }
    if config.intra_threads > 0 {
        builder = builder.with_intra_threads(config.intra_threads)?;
    }
    Ok(builder)
}
