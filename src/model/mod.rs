//! Classification model integration.
//!
//! Fetches a model definition and label metadata from a configured base
//! URL, builds a classifier through an injected engine, and scores
//! images locally. Fetched artifacts are cached on disk; user images
//! never travel anywhere.

mod cache;
mod client;
mod engine;
mod labels;
mod retry;

pub use cache::ModelCache;
pub use client::{
    top_prediction, LoadedModel, ModelClient, ModelLoadError, Prediction, MODEL_DEFINITION_FILE,
    MODEL_METADATA_FILE, MODEL_URL_ENV,
};
pub use engine::{Classifier, EngineError, InferenceEngine, InferenceError, LinearSoftmaxEngine};
pub use labels::{display_label, format_confidence, severity_for, Severity};
