use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_INPUT_SIZE: u32 = 28;
pub const DEFAULT_NUM_CLASSES: usize = 10;
pub const DEFAULT_THRESHOLD: f32 = 0.1;
pub const DEFAULT_MAX_RESULTS: usize = 3;

/// Largest logical width or height a canvas or drawing may have
pub const MAX_CANVAS_SIDE: f32 = 8192.0;

/// Width and height must be finite, positive and at most [`MAX_CANVAS_SIDE`]
pub fn check_surface_size(width: f32, height: f32) -> Result<()> {
    let fits = |v: f32| v.is_finite() && v > 0.0 && v <= MAX_CANVAS_SIDE;
    if !(fits(width) && fits(height)) {
        anyhow::bail!(
            "size must be positive and at most {}, got {}x{}",
            MAX_CANVAS_SIDE,
            width,
            height
        );
    }
    Ok(())
}

/// Logical drawing surface and rasterization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Logical canvas width in drawing units (one unit renders as one pixel)
    pub width: f32,
    pub height: f32,
    pub stroke_width: f32,
    /// Network input resolution; rasterization produces `input_size²` values
    pub input_size: u32,
}

impl CanvasConfig {
    pub fn validate(&self) -> Result<()> {
        check_surface_size(self.width, self.height).context("Invalid canvas")?;
        if !(self.stroke_width.is_finite() && self.stroke_width > 0.0) {
            anyhow::bail!("stroke_width must be positive, got {}", self.stroke_width);
        }
        if self.input_size == 0 {
            anyhow::bail!("canvas input_size must be positive");
        }
        Ok(())
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 280.0,
            height: 280.0,
            stroke_width: 22.0,
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

/// Parameters fixed at classifier construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path or `file://` URI of the serialized model
    pub model_source: String,
    pub input_name: String,
    pub output_name: String,
    pub input_size: u32,
    /// Tensor shape the flat pixel buffer is fed as
    pub input_shape: Vec<usize>,
    pub num_classes: usize,
    /// Scores at or below this value are discarded
    pub threshold: f32,
    pub max_results: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let pixels = (DEFAULT_INPUT_SIZE * DEFAULT_INPUT_SIZE) as usize;
        Self {
            model_source: "mnist_model_graph.rten".to_string(),
            input_name: "input".to_string(),
            output_name: "output".to_string(),
            input_size: DEFAULT_INPUT_SIZE,
            input_shape: vec![pixels],
            num_classes: DEFAULT_NUM_CLASSES,
            threshold: DEFAULT_THRESHOLD,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl ClassifierConfig {
    pub fn input_len(&self) -> usize {
        (self.input_size as usize) * (self.input_size as usize)
    }

    pub fn with_model_source(mut self, source: impl Into<String>) -> Self {
        self.model_source = source.into();
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            anyhow::bail!("input_size must be positive");
        }
        if self.num_classes == 0 {
            anyhow::bail!("num_classes must be positive");
        }
        if self.max_results == 0 {
            anyhow::bail!("max_results must be positive");
        }
        let shape_len: usize = self.input_shape.iter().product();
        if shape_len != self.input_len() {
            anyhow::bail!(
                "input_shape {:?} holds {} values, expected {} ({}x{})",
                self.input_shape,
                shape_len,
                self.input_len(),
                self.input_size,
                self.input_size
            );
        }
        Ok(())
    }
}

/// Everything the CLI can read from a JSON config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub canvas: CanvasConfig,
    pub classifier: ClassifierConfig,
    /// Text file with one label per line; digits when absent
    pub labels_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        self.canvas.validate()?;
        if self.canvas.input_size != self.classifier.input_size {
            anyhow::bail!(
                "canvas input_size {} does not match classifier input_size {}",
                self.canvas.input_size,
                self.classifier.input_size
            );
        }
        Ok(())
    }
}
