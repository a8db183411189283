//! Process-wide model handle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::{ClassifierConfig, ClassifierError, ImageClassifier, LoadPolicy, OnnxClassifier};

/// Classifier shared between request handlers
pub type SharedClassifier = Arc<dyn ImageClassifier>;

type Loader = Arc<dyn Fn() -> Result<SharedClassifier, ClassifierError> + Send + Sync>;

/// Lazily loads the classifier and hands it out to requests.
///
/// With [`LoadPolicy::Shared`] the first successful load is cached and every
/// later call gets the same instance; concurrent first callers wait on a single
/// load, and a failed load is retried by the next caller. With
/// [`LoadPolicy::PerRequest`] every call loads a fresh classifier.
pub struct ModelHandle {
    loader: Loader,
    policy: LoadPolicy,
    cell: OnceCell<SharedClassifier>,
    loads: AtomicUsize,
}

impl ModelHandle {
    /// Create a handle around an arbitrary loader
    pub fn new<F>(policy: LoadPolicy, loader: F) -> Self
    where
        F: Fn() -> Result<SharedClassifier, ClassifierError> + Send + Sync + 'static,
    {
        Self {
            loader: Arc::new(loader),
            policy,
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Create a handle that loads an [`OnnxClassifier`] from `config`
    pub fn from_config(config: ClassifierConfig) -> Self {
        let policy = config.load_policy;
        Self::new(policy, move || {
            OnnxClassifier::load(&config).map(|c| Arc::new(c) as SharedClassifier)
        })
    }

    /// Get a classifier according to the load policy
    pub async fn get(&self) -> Result<SharedClassifier, ClassifierError> {
        match self.policy {
            LoadPolicy::Shared => self.cell.get_or_try_init(|| self.load()).await.cloned(),
            LoadPolicy::PerRequest => self.load().await,
        }
    }

    /// Load eagerly (used at startup to fail fast)
    pub async fn preload(&self) -> Result<(), ClassifierError> {
        self.get().await.map(|_| ())
    }

    async fn load(&self) -> Result<SharedClassifier, ClassifierError> {
        let loader = self.loader.clone();
        let start = Instant::now();

        let result = tokio::task::spawn_blocking(move || loader())
            .await
            .map_err(|e| ClassifierError::ModelLoad(format!("load task failed: {}", e)))?;

        match &result {
            Ok(_) => {
                let n = self.loads.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::counter!("model_loads_total", "policy" => self.policy.as_str())
                    .increment(1);
                info!(
                    "Classifier ready in {}ms (policy={}, loads={})",
                    start.elapsed().as_millis(),
                    self.policy.as_str(),
                    n
                );
            }
            Err(e) => warn!("Classifier load failed: {}", e),
        }
        result
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    /// Whether a shared classifier is cached
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Number of successful loads so far
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}
