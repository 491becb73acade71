use anyhow::Result;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{error, info};

use crate::classifier::{Classifier, InferenceEngine, LabelSet};
use crate::config::ClassifierConfig;
use crate::error::ClassifyError;
use crate::models::Recognition;

/// Lifecycle of the classifier behind a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    Initializing,
    Ready,
    Failed(String),
    Closing,
    Closed,
}

type ClassifyReply = oneshot::Sender<Result<Vec<Recognition>, ClassifyError>>;

enum Job {
    Classify { pixels: Vec<f32>, reply: ClassifyReply },
    Close { reply: Option<oneshot::Sender<()>> },
}

/// Owns the classifier on a dedicated thread.
///
/// The model is loaded there before any job runs, and jobs run one at a time
/// in submission order, so at most one inference call is ever in flight.
/// Submitting never blocks: requests made while the model is still loading
/// fail with [`ClassifyError::NotReady`].
pub struct ClassifierWorker {
    jobs: mpsc::UnboundedSender<Job>,
    status: Arc<watch::Sender<WorkerStatus>>,
    input_len: usize,
    handle: Option<JoinHandle<()>>,
}

impl ClassifierWorker {
    /// Start the worker thread; `make_engine` and model loading both run on it
    pub fn spawn<F>(config: ClassifierConfig, labels: LabelSet, make_engine: F) -> Result<Self>
    where
        F: FnOnce() -> Box<dyn InferenceEngine> + Send + 'static,
    {
        let (jobs, queue) = mpsc::unbounded_channel();
        let status = Arc::new(watch::Sender::new(WorkerStatus::Initializing));
        let input_len = config.input_len();

        let worker_status = status.clone();
        let handle = thread::Builder::new()
            .name("classifier-worker".to_string())
            .spawn(move || run_worker(config, labels, make_engine, queue, worker_status))?;

        Ok(Self {
            jobs,
            status,
            input_len,
            handle: Some(handle),
        })
    }

    pub fn status(&self) -> WorkerStatus {
        self.status.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.status.borrow() == WorkerStatus::Ready
    }

    /// Resolves once model loading has finished, successfully or not
    pub async fn wait_ready(&self) -> Result<(), ClassifyError> {
        let mut updates = self.status.subscribe();
        let status = match updates.wait_for(|s| *s != WorkerStatus::Initializing).await {
            Ok(status) => status.clone(),
            Err(_) => return Err(ClassifyError::Closed),
        };

        match status {
            WorkerStatus::Ready => Ok(()),
            WorkerStatus::Failed(reason) => Err(ClassifyError::Initialization(reason)),
            _ => Err(ClassifyError::Closed),
        }
    }

    /// Queue a classification; the receiver yields its result
    pub fn submit(
        &self,
        pixels: Vec<f32>,
    ) -> Result<oneshot::Receiver<Result<Vec<Recognition>, ClassifyError>>, ClassifyError> {
        let status = self.status();
        match status {
            WorkerStatus::Ready => {}
            WorkerStatus::Initializing => return Err(ClassifyError::NotReady),
            WorkerStatus::Failed(reason) => return Err(ClassifyError::Initialization(reason)),
            WorkerStatus::Closing | WorkerStatus::Closed => return Err(ClassifyError::Closed),
        }

        if pixels.len() != self.input_len {
            return Err(ClassifyError::InvalidInput {
                expected: self.input_len,
                actual: pixels.len(),
            });
        }

        let (reply, result) = oneshot::channel();
        self.jobs
            .send(Job::Classify { pixels, reply })
            .map_err(|_| ClassifyError::Closed)?;
        Ok(result)
    }

    pub async fn classify(&self, pixels: Vec<f32>) -> Result<Vec<Recognition>, ClassifyError> {
        let result = self.submit(pixels)?;
        // A dropped reply means the worker shut down before reaching the job
        result.await.unwrap_or(Err(ClassifyError::Closed))
    }

    /// Marks the worker closing and queues the shutdown behind pending jobs.
    /// Returns None when a close was already requested.
    fn begin_close(&self) -> Option<oneshot::Receiver<()>> {
        let first = self.status.send_if_modified(|s| match s {
            WorkerStatus::Closing | WorkerStatus::Closed => false,
            _ => {
                *s = WorkerStatus::Closing;
                true
            }
        });
        if !first {
            return None;
        }

        let (reply, done) = oneshot::channel();
        // The worker only stops reading after a close job
        if self.jobs.send(Job::Close { reply: Some(reply) }).is_err() {
            // The thread already exited, so nothing will report Closed for us
            self.status.send_replace(WorkerStatus::Closed);
        }
        Some(done)
    }

    /// Release the engine once every queued classification has run.
    /// Safe to call repeatedly, and before the model finished loading.
    pub async fn close(&self) {
        match self.begin_close() {
            Some(done) => {
                // A dropped reply means the thread died without reaching the close job
                if done.await.is_err() {
                    self.status.send_replace(WorkerStatus::Closed);
                }
            }
            None => {
                let mut updates = self.status.subscribe();
                let _ = updates.wait_for(|s| *s == WorkerStatus::Closed).await;
            }
        }
    }

    /// Blocking shutdown for callers outside an async runtime
    pub fn shutdown(mut self) {
        let _ = self.begin_close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Classifier worker panicked");
            }
        }
    }
}

impl Drop for ClassifierWorker {
    fn drop(&mut self) {
        // Detach; the worker finishes queued jobs and releases the engine on its own
        let _ = self.begin_close();
    }
}

fn run_worker<F>(
    config: ClassifierConfig,
    labels: LabelSet,
    make_engine: F,
    mut queue: mpsc::UnboundedReceiver<Job>,
    status: Arc<watch::Sender<WorkerStatus>>,
) where
    F: FnOnce() -> Box<dyn InferenceEngine>,
{
    let _exit = ExitGuard(status.clone());
    let mut failure = None;
    let mut classifier = match Classifier::new(config, labels, make_engine()) {
        Ok(classifier) => {
            status.send_if_modified(|s| promote(s, WorkerStatus::Ready));
            Some(classifier)
        }
        Err(e) => {
            error!("{}", e);
            let reason = match &e {
                ClassifyError::Initialization(reason) => reason.clone(),
                other => other.to_string(),
            };
            status.send_if_modified(|s| promote(s, WorkerStatus::Failed(reason.clone())));
            failure = Some(e);
            None
        }
    };

    while let Some(job) = queue.blocking_recv() {
        match job {
            Job::Classify { pixels, reply } => {
                let result = match classifier.as_mut() {
                    Some(classifier) => classifier.classify(&pixels),
                    None => Err(failure.clone().unwrap_or(ClassifyError::Closed)),
                };
                // The caller may have stopped waiting
                let _ = reply.send(result);
            }
            Job::Close { reply } => {
                if let Some(mut classifier) = classifier.take() {
                    classifier.close();
                }
                status.send_replace(WorkerStatus::Closed);
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                info!("Classifier worker stopped");
                return;
            }
        }
    }

    // Every handle is gone without an explicit close
    if let Some(mut classifier) = classifier.take() {
        classifier.close();
    }
}

/// Publishes the final status however the worker thread ends, panics included
struct ExitGuard(Arc<watch::Sender<WorkerStatus>>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| match s {
            WorkerStatus::Closed => false,
            WorkerStatus::Initializing => {
                *s = WorkerStatus::Failed("Classifier worker exited while loading the model".to_string());
                true
            }
            _ => {
                *s = WorkerStatus::Closed;
                true
            }
        });
    }
}

/// Initialization results only apply while nobody asked to close
fn promote(current: &mut WorkerStatus, next: WorkerStatus) -> bool {
    if *current == WorkerStatus::Initializing {
        *current = next;
        true
    } else {
        false
    }
}
