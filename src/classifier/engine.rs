use anyhow::{Context, Result};
use rten::Model;
use rten_tensor::prelude::*;
use rten_tensor::Tensor;
use std::path::{Path, PathBuf};
use tracing::info;

/// Runs the trained network. Implementations need not support concurrent calls.
pub trait InferenceEngine: Send {
    fn initialize(&mut self, model_source: &str) -> Result<()>;

    /// Feed `input` under `input_name` and read back the flat `output_name` tensor
    fn run_inference(&mut self, input_name: &str, output_name: &str, input: &[f32]) -> Result<Vec<f32>>;

    fn close(&mut self);
}

/// Accepts plain paths as well as `file://` URIs
pub fn model_path(source: &str) -> PathBuf {
    PathBuf::from(source.strip_prefix("file://").unwrap_or(source))
}

/// Inference on `.rten` / ONNX models through the rten runtime
pub struct RtenEngine {
    input_shape: Vec<usize>,
    model: Option<Model>,
}

impl RtenEngine {
    pub fn new(input_shape: Vec<usize>) -> Self {
        Self {
            input_shape,
            model: None,
        }
    }

    fn load(path: &Path) -> Result<Model> {
        if !path.exists() {
            anyhow::bail!("Model not found: {}", path.display());
        }
        Model::load_file(path).with_context(|| format!("Failed to load model {}", path.display()))
    }
}

impl InferenceEngine for RtenEngine {
    fn initialize(&mut self, model_source: &str) -> Result<()> {
        let path = model_path(model_source);
        let model = Self::load(&path)?;
        info!(model = %path.display(), "Model loaded");
        self.model = Some(model);
        Ok(())
    }

    fn run_inference(&mut self, input_name: &str, output_name: &str, input: &[f32]) -> Result<Vec<f32>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Model is not loaded"))?;

        let input_id = model
            .find_node(input_name)
            .ok_or_else(|| anyhow::anyhow!("Model has no input named '{}'", input_name))?;
        let output_id = model
            .find_node(output_name)
            .ok_or_else(|| anyhow::anyhow!("Model has no output named '{}'", output_name))?;

        let tensor = Tensor::from_data(self.input_shape.as_slice(), input.to_vec());
        let mut outputs = model.run(vec![(input_id, tensor.view().into())], &[output_id], None)?;
        if outputs.is_empty() {
            anyhow::bail!("Model produced no output for '{}'", output_name);
        }

        let scores: Tensor<f32> = outputs
            .remove(0)
            .try_into()
            .map_err(|e| anyhow::anyhow!("Output '{}' is not a float tensor: {:?}", output_name, e))?;
        Ok(scores.to_vec())
    }

    fn close(&mut self) {
        if self.model.take().is_some() {
            info!("Model released");
        }
    }
}
