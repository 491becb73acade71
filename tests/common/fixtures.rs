use digitsketch::{ClassifierConfig, ClassifierWorker, InferenceEngine, LabelSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

/// Output scores used throughout the tests: class 1, then 2, then 9 clear 0.1
pub const EXAMPLE_SCORES: [f32; 10] = [0.05, 0.92, 0.3, 0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.15];

/// Scripted stand-in for a real model
pub struct FakeEngine {
    scores: Vec<f32>,
    fail_init: bool,
    panic_init: bool,
    fail_run: bool,
    delay: Option<Duration>,
    gate: Option<mpsc::Receiver<()>>,
    pub probe: EngineProbe,
}

/// Shared view of what the engine saw, kept by the test after the engine moves away
#[derive(Clone, Default)]
pub struct EngineProbe {
    pub calls: Arc<AtomicUsize>,
    pub closed: Arc<AtomicBool>,
    pub model_source: Arc<Mutex<Option<String>>>,
    /// First pixel of every input, in call order
    pub first_pixels: Arc<Mutex<Vec<f32>>>,
}

impl EngineProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn first_pixels(&self) -> Vec<f32> {
        self.first_pixels.lock().unwrap().clone()
    }
}

impl FakeEngine {
    pub fn with_scores(scores: &[f32]) -> Self {
        Self {
            scores: scores.to_vec(),
            fail_init: false,
            panic_init: false,
            fail_run: false,
            delay: None,
            gate: None,
            probe: EngineProbe::default(),
        }
    }

    pub fn failing_init() -> Self {
        Self {
            fail_init: true,
            ..Self::with_scores(&EXAMPLE_SCORES)
        }
    }

    pub fn panicking_init() -> Self {
        Self {
            panic_init: true,
            ..Self::with_scores(&EXAMPLE_SCORES)
        }
    }

    pub fn failing_run(mut self) -> Self {
        self.fail_run = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Initialization blocks until the returned sender fires
    pub fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (release, gate) = mpsc::channel();
        self.gate = Some(gate);
        (self, release)
    }
}

impl InferenceEngine for FakeEngine {
    fn initialize(&mut self, model_source: &str) -> anyhow::Result<()> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv();
        }
        *self.probe.model_source.lock().unwrap() = Some(model_source.to_string());
        if self.panic_init {
            panic!("engine crashed while loading");
        }
        if self.fail_init {
            anyhow::bail!("model file is corrupt");
        }
        Ok(())
    }

    fn run_inference(&mut self, input_name: &str, output_name: &str, input: &[f32]) -> anyhow::Result<Vec<f32>> {
        assert_eq!(input_name, "input");
        assert_eq!(output_name, "output");
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        self.probe
            .first_pixels
            .lock()
            .unwrap()
            .push(input.first().copied().unwrap_or_default());

        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_run {
            anyhow::bail!("engine reported failure");
        }
        Ok(self.scores.clone())
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

pub fn test_config() -> ClassifierConfig {
    ClassifierConfig::default().with_model_source("file:///models/mnist.rten")
}

pub fn blank_pixels() -> Vec<f32> {
    vec![0.0; 28 * 28]
}

/// Pixels whose first value tags the request
pub fn tagged_pixels(tag: f32) -> Vec<f32> {
    let mut pixels = blank_pixels();
    pixels[0] = tag;
    pixels
}

/// Spawn a worker around `engine`; the probe stays with the caller
pub fn spawn_worker(engine: FakeEngine) -> (ClassifierWorker, EngineProbe) {
    let probe = engine.probe.clone();
    let worker = ClassifierWorker::spawn(test_config(), LabelSet::digits(10), move || {
        Box::new(engine) as Box<dyn InferenceEngine>
    })
    .expect("Failed to spawn classifier worker");
    (worker, probe)
}
