pub mod engine;
pub mod labels;
pub mod ranking;

use std::time::{Duration, Instant};
use tracing::{debug, debug_span, info};

use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::models::Recognition;

pub use engine::{InferenceEngine, RtenEngine};
pub use labels::LabelSet;

/// Call counters; they never influence results
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifierStats {
    pub calls: u64,
    pub last_inference: Option<Duration>,
}

/// Wraps one inference engine and turns raw class scores into ranked results
pub struct Classifier {
    config: ClassifierConfig,
    labels: LabelSet,
    engine: Box<dyn InferenceEngine>,
    closed: bool,
    stats: ClassifierStats,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("config", &self.config)
            .field("labels", &self.labels.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Classifier {
    /// Initializes `engine` with the configured model; blocks while the model loads
    pub fn new(
        config: ClassifierConfig,
        labels: LabelSet,
        mut engine: Box<dyn InferenceEngine>,
    ) -> Result<Self, ClassifyError> {
        config.validate().map_err(ClassifyError::initialization)?;
        engine
            .initialize(&config.model_source)
            .map_err(ClassifyError::initialization)?;

        info!(
            labels = labels.len(),
            classes = config.num_classes,
            "Classifier ready"
        );

        Ok(Self {
            config,
            labels,
            engine,
            closed: false,
            stats: ClassifierStats::default(),
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn stats(&self) -> ClassifierStats {
        self.stats
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn classify(&mut self, pixels: &[f32]) -> Result<Vec<Recognition>, ClassifyError> {
        if self.closed {
            return Err(ClassifyError::Closed);
        }

        let expected = self.config.input_len();
        if pixels.len() != expected {
            return Err(ClassifyError::InvalidInput {
                expected,
                actual: pixels.len(),
            });
        }

        let _span = debug_span!("classify").entered();
        let started = Instant::now();
        let scores = self
            .engine
            .run_inference(&self.config.input_name, &self.config.output_name, pixels)
            .map_err(ClassifyError::inference)?;
        let elapsed = started.elapsed();

        self.stats.calls += 1;
        self.stats.last_inference = Some(elapsed);
        debug!(elapsed_ms = elapsed.as_secs_f64() * 1000.0, "Inference finished");

        if scores.len() != self.config.num_classes {
            return Err(ClassifyError::Inference(format!(
                "expected {} class scores, engine returned {}",
                self.config.num_classes,
                scores.len()
            )));
        }

        Ok(ranking::rank_scores(
            &scores,
            &self.labels,
            self.config.threshold,
            self.config.max_results,
        ))
    }

    /// Releases the engine. Safe to call more than once.
    pub fn close(&mut self) {
        if !self.closed {
            self.engine.close();
            self.closed = true;
            info!(calls = self.stats.calls, "Classifier closed");
        }
    }
}

impl Drop for Classifier {
    fn drop(&mut self) {
        self.close();
    }
}
