//! ModelClient - fetches model artifacts and builds a loaded model.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use log::{debug, info, warn};
use serde::Deserialize;

use super::cache::ModelCache;
use super::engine::{Classifier, EngineError, InferenceEngine, InferenceError};
use super::retry::{
    calculate_backoff, is_transient_network_error, DEFAULT_BACKOFF_BASE, DEFAULT_BACKOFF_MAX,
    DEFAULT_NETWORK_RETRIES,
};

/// Environment variable holding the model base URL.
pub const MODEL_URL_ENV: &str = "ATTIRE_MODEL_URL";

/// Definition document name under the base URL.
pub const MODEL_DEFINITION_FILE: &str = "model.json";

/// Label metadata document name under the base URL.
pub const MODEL_METADATA_FILE: &str = "metadata.json";

/// Timeout for a whole HTTP request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Label metadata document: `{"labels": [...]}` plus fields we ignore.
#[derive(Debug, Deserialize)]
struct ModelMetadata {
    labels: Vec<String>,
}

/// One classifier output: a label and the score the model gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

/// The entry with the highest probability; exact ties keep the
/// first-encountered entry.
pub fn top_prediction(predictions: &[Prediction]) -> Option<&Prediction> {
    let mut best: Option<&Prediction> = None;
    for candidate in predictions {
        match best {
            Some(current) if candidate.probability > current.probability => {
                best = Some(candidate);
            }
            None => best = Some(candidate),
            _ => {}
        }
    }
    best
}

/// A classifier paired with its labels, ready to score images.
pub struct LoadedModel {
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl LoadedModel {
    /// Pair a classifier with its labels.
    ///
    /// # Errors
    /// * `ModelLoadError::LabelCountMismatch` - label and class counts differ
    pub fn new(classifier: Box<dyn Classifier>, labels: Vec<String>) -> Result<Self, ModelLoadError> {
        if labels.len() != classifier.class_count() {
            return Err(ModelLoadError::LabelCountMismatch {
                labels: labels.len(),
                outputs: classifier.class_count(),
            });
        }
        Ok(Self { classifier, labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Score an image against every class.
    ///
    /// Returns one prediction per label, in label order, unsorted.
    /// Scores are passed through exactly as the classifier produced
    /// them.
    pub fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>, InferenceError> {
        let scores = self.classifier.predict(image)?;
        if scores.len() != self.labels.len() {
            return Err(InferenceError::ScoreCountMismatch {
                expected: self.labels.len(),
                got: scores.len(),
            });
        }

        Ok(self
            .labels
            .iter()
            .zip(scores)
            .map(|(label, probability)| Prediction {
                label: label.clone(),
                probability,
            })
            .collect())
    }

    /// Decode encoded image bytes (JPEG, PNG, ...) and classify them.
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Vec<Prediction>, InferenceError> {
        let image = image::load_from_memory(bytes)?;
        self.classify(&image)
    }
}

/// Client that loads a model from a base URL.
///
/// The base URL must resolve `model.json` and `metadata.json` beneath
/// it. The inference engine is injected so callers (and tests) decide
/// how definitions become classifiers. Only these two documents are
/// ever fetched; images never leave the process.
pub struct ModelClient {
    base_url: String,
    http_client: reqwest::Client,
    engine: Arc<dyn InferenceEngine>,
    cache: Option<ModelCache>,
    max_retries: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl ModelClient {
    /// Create a client for the given base URL.
    ///
    /// # Errors
    /// Returns `ModelLoadError::MissingUrl` for an empty URL.
    pub fn new(
        base_url: impl Into<String>,
        engine: Arc<dyn InferenceEngine>,
    ) -> Result<Self, ModelLoadError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ModelLoadError::MissingUrl);
        }

        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url,
            http_client,
            engine,
            cache: None,
            max_retries: DEFAULT_NETWORK_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        })
    }

    /// Attach an artifact cache used as a fallback when the source is
    /// unreachable.
    pub fn with_cache(mut self, cache: ModelCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Override the retry behavior for transient fetch failures.
    pub fn with_retry_config(
        mut self,
        max_retries: u32,
        backoff_base: Duration,
        backoff_max: Duration,
    ) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self.backoff_max = backoff_max;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the definition and metadata and build a loaded model.
    ///
    /// The source is refetched on every call so a newer model wins;
    /// when the network is down the cached copy is used instead, with
    /// a warning. Loading again after a success is fine; the caller
    /// keeps whichever result it prefers.
    ///
    /// # Errors
    /// Any `ModelLoadError`: unreachable source with no cached copy,
    /// non-2xx responses, malformed documents, or label/class mismatch.
    pub async fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        info!("Loading model from {}", self.base_url);

        let (definition, metadata) = match self.fetch_documents().await {
            Ok(docs) => {
                if let Some(cache) = &self.cache {
                    if let Err(e) = cache.store(&self.base_url, &docs.0, &docs.1) {
                        warn!("Failed to cache model artifacts: {}", e);
                    }
                }
                docs
            }
            Err(err @ ModelLoadError::Network { .. }) => {
                match self.cache.as_ref().and_then(|c| c.get(&self.base_url)) {
                    Some(docs) => {
                        warn!("Model source unreachable ({}), using cached copy", err);
                        docs
                    }
                    None => return Err(err),
                }
            }
            Err(e) => return Err(e),
        };

        let classifier = self.engine.build(&definition)?;
        let labels = parse_metadata(&metadata)?;
        let model = LoadedModel::new(classifier, labels)?;
        info!("Model ready with {} classes", model.labels().len());
        Ok(model)
    }

    async fn fetch_documents(&self) -> Result<(Vec<u8>, Vec<u8>), ModelLoadError> {
        let definition = self.fetch_with_retry(MODEL_DEFINITION_FILE).await?;
        let metadata = self.fetch_with_retry(MODEL_METADATA_FILE).await?;
        Ok((definition, metadata))
    }

    /// Fetch one document, retrying transient failures with exponential
    /// backoff. Non-transient errors return immediately. Exhausted
    /// retries surface as `Network` so `load` can fall back to the
    /// cache.
    async fn fetch_with_retry(&self, name: &str) -> Result<Vec<u8>, ModelLoadError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.fetch_document(name).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) if is_retryable(&e) => {
                    if attempts > self.max_retries {
                        return Err(ModelLoadError::Network {
                            message: e.to_string(),
                            attempts,
                        });
                    }
                    let delay = calculate_backoff(attempts - 1, self.backoff_base, self.backoff_max);
                    warn!(
                        "Fetching {} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        name,
                        attempts,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_document(&self, name: &str) -> Result<Vec<u8>, ModelLoadError> {
        let url = join_url(&self.base_url, name);
        debug!("GET {}", url);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ModelLoadError::Status {
                resource: name.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

/// Whether a fetch failure is worth retrying. Connection-level trouble
/// and gateway-side 502/503/504 responses usually clear up; anything
/// else will not improve on retry.
fn is_retryable(error: &ModelLoadError) -> bool {
    match error {
        ModelLoadError::Http(e) => is_transient_network_error(e),
        ModelLoadError::Status { status, .. } => matches!(status, 502 | 503 | 504),
        _ => false,
    }
}

fn parse_metadata(bytes: &[u8]) -> Result<Vec<String>, ModelLoadError> {
    let metadata: ModelMetadata = serde_json::from_slice(bytes)
        .map_err(|e| ModelLoadError::MalformedMetadata(e.to_string()))?;
    if metadata.labels.is_empty() {
        return Err(ModelLoadError::MalformedMetadata(
            "metadata contains no labels".to_string(),
        ));
    }
    Ok(metadata.labels)
}

/// Join a document name onto the base URL, tolerating a missing
/// trailing slash.
fn join_url(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Errors loading a model. All of these are terminal for the session:
/// classification stays unavailable until the app restarts with a
/// working source.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model URL not configured. Set ATTIRE_MODEL_URL or add [model] url to the config file")]
    MissingUrl,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetching {resource} failed with status {status}")]
    Status { resource: String, status: u16 },

    #[error("Network error: {message} (after {attempts} attempts)")]
    Network { message: String, attempts: u32 },

    #[error("Malformed label metadata: {0}")]
    MalformedMetadata(String),

    #[error("Model has {labels} labels but the classifier outputs {outputs} classes")]
    LabelCountMismatch { labels: usize, outputs: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
