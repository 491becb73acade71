#![allow(dead_code)]
#![allow(unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from digitsketch for tests
pub use digitsketch::{
    CanvasConfig, Classifier, ClassifierConfig, ClassifierWorker, ClassifyError, Drawing,
    DrawingSession, LabelSet, PixelBuffer, Recognition, StrokeCanvas, SurfaceEvent, SurfaceMapping,
    WorkerStatus,
};
