pub mod canvas;
pub mod classifier;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod worker;

pub use canvas::{PixelBuffer, StrokeCanvas, SurfaceMapping};
pub use classifier::{Classifier, ClassifierStats, InferenceEngine, LabelSet, RtenEngine};
pub use config::{AppConfig, CanvasConfig, ClassifierConfig};
pub use error::ClassifyError;
pub use models::{BoundingBox, Drawing, Point, Recognition, Stroke, format_recognitions};
pub use session::{DrawingSession, SurfaceEvent};
pub use worker::{ClassifierWorker, WorkerStatus};
